use thiserror::Error;

/// Failure of a single collaborator sensor operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("No valid fix")]
    NoFix,

    #[error("Invalid reading: {0}")]
    Invalid(String),
}

/// Orientation calibration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration needs at least one sample")]
    NoIterations,

    #[error("Calibration sample {index} failed: {source}")]
    Read {
        index: u32,
        #[source]
        source: SensorError,
    },

    #[error("Degenerate gravity estimate (magnitude {magnitude:e})")]
    Degenerate { magnitude: f64 },
}

/// Payload transmission errors
#[derive(Error, Debug)]
pub enum TransmitError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collector answered with status {0}")]
    Status(u16),

    #[error("Payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Fatal node bring-up errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Failed to find {sensor}: {source}")]
    SensorMissing {
        sensor: &'static str,
        #[source]
        source: SensorError,
    },

    #[error("Failed to initialize accelerometer transform: {0}")]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
