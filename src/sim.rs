//! Host-side stand-ins for the node's sensors.
//!
//! The simulated sensors generate deterministic signals so the full control
//! loop can run on a workstation. `RecordedImu` replays a captured sample log.

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SensorError;
use crate::sensors::{
    BiometricReading, InertialReading, LocationFix, PressureReading, Sensor, Vec3,
};

/// Fall inserted into the simulated stream
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallScript {
    /// Resting samples before the fall begins
    pub after_samples: u64,
    /// Near-weightless samples before the impact
    pub free_fall_samples: u64,
    /// Impact strength as a multiple of resting gravity
    pub impact_g: f64,
}

impl FallScript {
    pub fn after(after_samples: u64) -> Self {
        Self {
            after_samples,
            free_fall_samples: 4,
            impact_g: 2.5,
        }
    }
}

/// Accelerometer/gyro at rest with a fixed mounting tilt.
///
/// Raw readings are in m/s², like the vendor driver reports them; the
/// calibration transform normalizes them to g.
pub struct SimulatedImu {
    gravity: Vec3,
    noise: f64,
    count: u64,
    script: Option<FallScript>,
}

impl SimulatedImu {
    pub const STANDARD_GRAVITY: f64 = 9.80665;

    /// Sensor tilted by `roll_deg` about x and `pitch_deg` about y
    pub fn tilted(roll_deg: f64, pitch_deg: f64) -> Self {
        let (roll, pitch) = (roll_deg.to_radians(), pitch_deg.to_radians());
        let gravity = Vec3::new(
            -pitch.sin(),
            roll.sin() * pitch.cos(),
            roll.cos() * pitch.cos(),
        ) * Self::STANDARD_GRAVITY;

        Self {
            gravity,
            noise: 0.05,
            count: 0,
            script: None,
        }
    }

    pub fn with_fall(mut self, script: FallScript) -> Self {
        self.script = Some(script);
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn samples_read(&self) -> u64 {
        self.count
    }

    fn accel_at(&self, n: u64) -> Vec3 {
        let t = n as f64 * 0.08;
        let jitter = Vec3::new(
            (t * 2.0 * PI).sin(),
            (t * 1.3 * PI).cos(),
            (t * 0.7 * PI).sin(),
        ) * self.noise;

        if let Some(script) = self.script {
            let fall_start = script.after_samples;
            let impact = fall_start + script.free_fall_samples;
            if (fall_start..impact).contains(&n) {
                return jitter * 0.1;
            }
            if n == impact {
                return self.gravity * script.impact_g + jitter;
            }
        }

        self.gravity + jitter
    }
}

impl Default for SimulatedImu {
    fn default() -> Self {
        Self::tilted(0.0, 0.0)
    }
}

impl Sensor for SimulatedImu {
    type Reading = InertialReading;

    fn name(&self) -> &'static str {
        "MPU6050"
    }

    fn read(&mut self) -> Result<InertialReading, SensorError> {
        let n = self.count;
        self.count += 1;

        let t = n as f64 * 0.08;
        let gyro = Vec3::new((t * 0.5).sin() * 0.05, (t * 0.3).cos() * 0.03, (t * 1.0).sin() * 0.1);
        Ok(InertialReading::new(self.accel_at(n), gyro))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedSample {
    pub accel: [f64; 3],
    pub gyro: [f64; 3],
}

impl From<RecordedSample> for InertialReading {
    fn from(s: RecordedSample) -> Self {
        InertialReading::new(Vec3::from(s.accel), Vec3::from(s.gyro))
    }
}

impl From<InertialReading> for RecordedSample {
    fn from(r: InertialReading) -> Self {
        Self {
            accel: [r.accel.x, r.accel.y, r.accel.z],
            gyro: [r.gyro.x, r.gyro.y, r.gyro.z],
        }
    }
}

/// Captured inertial log. A `null` entry is a failed read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub samples: Vec<Option<RecordedSample>>,
}

impl Recording {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Replays readings in order; reads fail once the log is exhausted
pub struct RecordedImu {
    samples: VecDeque<Option<InertialReading>>,
}

impl RecordedImu {
    pub fn from_samples(samples: Vec<Option<InertialReading>>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn from_recording(recording: Recording) -> Self {
        Self::from_samples(
            recording
                .samples
                .into_iter()
                .map(|s| s.map(InertialReading::from))
                .collect(),
        )
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl Sensor for RecordedImu {
    type Reading = InertialReading;

    fn name(&self) -> &'static str {
        "MPU6050"
    }

    fn read(&mut self) -> Result<InertialReading, SensorError> {
        match self.samples.pop_front() {
            Some(Some(reading)) => Ok(reading),
            Some(None) => Err(SensorError::ReadFailed("recorded dropout".to_string())),
            None => Err(SensorError::ReadFailed("recording exhausted".to_string())),
        }
    }
}

/// Availability of a simulated auxiliary sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Availability {
    Working,
    /// Probes fine, every read fails
    Failing,
    /// Not on the bus at all
    Missing,
}

fn probe_for(name: &str, availability: Availability) -> Result<(), SensorError> {
    match availability {
        Availability::Missing => Err(SensorError::NotFound(name.to_string())),
        _ => Ok(()),
    }
}

pub struct SimulatedBiometrics {
    reading: BiometricReading,
    availability: Availability,
}

impl SimulatedBiometrics {
    pub fn new(heart_rate_bpm: i32, spo2: i32) -> Self {
        Self {
            reading: BiometricReading {
                heart_rate_bpm,
                spo2,
            },
            availability: Availability::Working,
        }
    }

    /// Finger not on the sensor: the estimate never validates
    pub fn failing() -> Self {
        Self {
            availability: Availability::Failing,
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self {
            availability: Availability::Missing,
            ..Self::default()
        }
    }
}

impl Default for SimulatedBiometrics {
    fn default() -> Self {
        Self::new(72, 98)
    }
}

impl Sensor for SimulatedBiometrics {
    type Reading = BiometricReading;

    fn name(&self) -> &'static str {
        "MAX30102"
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        probe_for(self.name(), self.availability)
    }

    fn read(&mut self) -> Result<BiometricReading, SensorError> {
        match self.availability {
            Availability::Working => Ok(self.reading),
            _ => Err(SensorError::Invalid("heart rate / SpO2 estimate not valid".to_string())),
        }
    }
}

pub struct SimulatedGps {
    fix: Option<LocationFix>,
}

impl SimulatedGps {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            fix: Some(LocationFix {
                latitude,
                longitude,
                altitude_m,
            }),
        }
    }

    /// No satellite fix yet
    pub fn unavailable() -> Self {
        Self { fix: None }
    }
}

impl Default for SimulatedGps {
    fn default() -> Self {
        Self::new(10.7769, 106.7009, 12.0)
    }
}

impl Sensor for SimulatedGps {
    type Reading = LocationFix;

    fn name(&self) -> &'static str {
        "NEO-6M"
    }

    fn read(&mut self) -> Result<LocationFix, SensorError> {
        self.fix.ok_or(SensorError::NoFix)
    }
}

pub struct SimulatedBarometer {
    reading: PressureReading,
    availability: Availability,
}

impl SimulatedBarometer {
    pub fn new(pressure_pa: f64) -> Self {
        Self {
            reading: PressureReading {
                pressure_pa,
                altitude_m: barometric_altitude(pressure_pa, SEA_LEVEL_PA),
            },
            availability: Availability::Working,
        }
    }

    pub fn failing() -> Self {
        Self {
            availability: Availability::Failing,
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self {
            availability: Availability::Missing,
            ..Self::default()
        }
    }
}

impl Default for SimulatedBarometer {
    fn default() -> Self {
        Self::new(101_000.0)
    }
}

impl Sensor for SimulatedBarometer {
    type Reading = PressureReading;

    fn name(&self) -> &'static str {
        "BMP280"
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        probe_for(self.name(), self.availability)
    }

    fn read(&mut self) -> Result<PressureReading, SensorError> {
        match self.availability {
            Availability::Working => Ok(self.reading),
            _ => Err(SensorError::ReadFailed("BMP280 did not respond".to_string())),
        }
    }
}

pub const SEA_LEVEL_PA: f64 = 101_325.0;

/// International barometric formula
pub fn barometric_altitude(pressure_pa: f64, sea_level_pa: f64) -> f64 {
    44_330.0 * (1.0 - (pressure_pa / sea_level_pa).powf(0.1903))
}
