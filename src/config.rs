use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alert::AlertPattern;
use crate::detector::DetectorConfig;
use crate::error::ConfigError;

/// Credentials the collector authenticates events with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: u64,
    pub device_token: String,
}

/// Node settings. Every field has a default, so a config file only needs to
/// name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub collector_url: String,
    pub device_id: u64,
    pub device_token: String,

    pub poll_interval_ms: u64,
    pub calibration_iterations: u32,
    pub calibration_delay_ms: u64,

    pub near_zero_threshold_g: f64,
    pub impact_threshold_g: f64,
    pub phase_window_ms: u64,

    pub alert_on_ms: u64,
    pub alert_off_ms: u64,
    pub halt_poll_ms: u64,

    /// Per-request timeout for the collector POST, none by default
    pub http_timeout_secs: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            collector_url: "http://192.168.1.142:8000/events/".to_string(),
            device_id: 42,
            device_token: "string".to_string(),
            poll_interval_ms: 80,
            calibration_iterations: 10,
            calibration_delay_ms: 100,
            near_zero_threshold_g: 0.1,
            impact_threshold_g: -1.0,
            phase_window_ms: 2000,
            alert_on_ms: 500,
            alert_off_ms: 500,
            halt_poll_ms: 500,
            http_timeout_secs: None,
        }
    }
}

impl NodeConfig {
    /// Load a JSON config file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: NodeConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calibration_iterations == 0 {
            return Err(ConfigError::Invalid(
                "calibration_iterations must be at least 1".to_string(),
            ));
        }
        if self.phase_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "phase_window_ms must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("alert_on_ms", self.alert_on_ms),
            ("alert_off_ms", self.alert_off_ms),
            ("halt_poll_ms", self.halt_poll_ms),
        ] {
            // The alert and halt loops sleep this long per iteration
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if !(self.near_zero_threshold_g > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "near_zero_threshold_g must be positive, got {}",
                self.near_zero_threshold_g
            )));
        }
        if !(self.impact_threshold_g < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "impact_threshold_g must be negative, got {}",
                self.impact_threshold_g
            )));
        }
        if self.collector_url.is_empty() {
            return Err(ConfigError::Invalid("collector_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            device_id: self.device_id,
            device_token: self.device_token.clone(),
        }
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            near_zero_g: self.near_zero_threshold_g,
            impact_g: self.impact_threshold_g,
            phase_window_ms: self.phase_window_ms,
        }
    }

    pub fn alert_pattern(&self) -> AlertPattern {
        AlertPattern {
            on: Duration::from_millis(self.alert_on_ms),
            off: Duration::from_millis(self.alert_off_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn calibration_delay(&self) -> Duration {
        Duration::from_millis(self.calibration_delay_ms)
    }

    pub fn halt_poll(&self) -> Duration {
        Duration::from_millis(self.halt_poll_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "fall_node_{}_{}.json",
            name,
            std::process::id()
        ));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_match_deployed_node() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detector(), DetectorConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(80));
        assert_eq!(config.calibration_iterations, 10);
        assert_eq!(config.calibration_delay(), Duration::from_millis(100));
        assert_eq!(config.alert_pattern(), AlertPattern::default());
        assert_eq!(config.http_timeout(), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_temp(
            "partial",
            r#"{"device_id": 7, "device_token": "abc", "phase_window_ms": 1500}"#,
        );
        let config = NodeConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            config.identity(),
            DeviceIdentity {
                device_id: 7,
                device_token: "abc".to_string()
            }
        );
        assert_eq!(config.phase_window_ms, 1500);
        assert_eq!(config.poll_interval_ms, 80);
        assert_eq!(config.collector_url, NodeConfig::default().collector_url);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let path = write_temp("invalid", r#"{"impact_threshold_g": 1.5}"#);
        let err = NodeConfig::load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_file_rejected() {
        let path = write_temp("malformed", "{ not json");
        let err = NodeConfig::load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = NodeConfig::load("/nonexistent/fall_node.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            NodeConfig {
                calibration_iterations: 0,
                ..NodeConfig::default()
            },
            NodeConfig {
                phase_window_ms: 0,
                ..NodeConfig::default()
            },
            NodeConfig {
                near_zero_threshold_g: 0.0,
                ..NodeConfig::default()
            },
            NodeConfig {
                impact_threshold_g: f64::NAN,
                ..NodeConfig::default()
            },
            NodeConfig {
                collector_url: String::new(),
                ..NodeConfig::default()
            },
        ];

        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be invalid", config);
        }
    }

    #[test]
    fn test_validate_rejects_zero_periods() {
        let bad = [
            NodeConfig {
                alert_on_ms: 0,
                ..NodeConfig::default()
            },
            NodeConfig {
                alert_off_ms: 0,
                ..NodeConfig::default()
            },
            NodeConfig {
                halt_poll_ms: 0,
                ..NodeConfig::default()
            },
        ];

        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be invalid", config);
        }
    }
}
