use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::SensorError;

/// Three-axis vector. Acceleration is in g once calibrated, gyro rates in rad/s.
pub type Vec3 = Vector3<f64>;

/// One inertial sample: acceleration and angular rate read in the same call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InertialReading {
    pub accel: Vec3,
    pub gyro: Vec3,
}

impl InertialReading {
    pub fn new(accel: Vec3, gyro: Vec3) -> Self {
        Self { accel, gyro }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiometricReading {
    pub heart_rate_bpm: i32,
    pub spo2: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureReading {
    pub pressure_pa: f64,
    pub altitude_m: f64,
}

/// A polled sensor the node depends on.
///
/// `probe` is called once during bring-up and a failure there is fatal.
/// `read` blocks until a sample is available or the read fails.
pub trait Sensor: Send {
    type Reading;

    fn name(&self) -> &'static str;

    fn probe(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<Self::Reading, SensorError>;
}

pub type InertialSensor = dyn Sensor<Reading = InertialReading>;
pub type BiometricSensor = dyn Sensor<Reading = BiometricReading>;
pub type LocationSensor = dyn Sensor<Reading = LocationFix>;
pub type PressureSensor = dyn Sensor<Reading = PressureReading>;

/// Every sensor handle the node owns
pub struct SensorSuite {
    pub imu: Box<InertialSensor>,
    pub biometric: Box<BiometricSensor>,
    pub location: Box<LocationSensor>,
    pub pressure: Box<PressureSensor>,
}

impl SensorSuite {
    pub fn new(
        imu: Box<InertialSensor>,
        biometric: Box<BiometricSensor>,
        location: Box<LocationSensor>,
        pressure: Box<PressureSensor>,
    ) -> Self {
        Self {
            imu,
            biometric,
            location,
            pressure,
        }
    }

    /// Check the sensors that must be present before monitoring starts.
    ///
    /// The location receiver is a passive stream, so it is not probed; having
    /// no fix at power-on is normal.
    pub fn probe_required(&mut self) -> Result<(), (&'static str, SensorError)> {
        probe_one(self.imu.as_mut())?;
        probe_one(self.biometric.as_mut())?;
        probe_one(self.pressure.as_mut())?;
        Ok(())
    }
}

fn probe_one<R>(sensor: &mut dyn Sensor<Reading = R>) -> Result<(), (&'static str, SensorError)> {
    let name = sensor.name();
    match sensor.probe() {
        Ok(()) => {
            log::info!("{} found.", name);
            Ok(())
        }
        Err(e) => Err((name, e)),
    }
}
