use serde::Serialize;

use crate::config::DeviceIdentity;
use crate::detector::FallEvent;
use crate::sensors::{BiometricReading, LocationFix, PressureReading, SensorSuite};

/// Category tag the collector files fall events under
pub const FALL_DETECTED: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BiometricGroup {
    pub heart_rate_bpm: i32,
    pub spo2: i32,
}

impl From<BiometricReading> for BiometricGroup {
    fn from(r: BiometricReading) -> Self {
        Self {
            heart_rate_bpm: r.heart_rate_bpm,
            spo2: r.spo2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LocationGroup {
    pub latitude: f64,
    pub longitude: f64,
    pub location_altitude_meter: f64,
}

impl From<LocationFix> for LocationGroup {
    fn from(fix: LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            location_altitude_meter: fix.altitude_m,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PressureGroup {
    pub pressure_pa: f64,
    pub pressure_altitude_meter: f64,
}

impl From<PressureReading> for PressureGroup {
    fn from(r: PressureReading) -> Self {
        Self {
            pressure_pa: r.pressure_pa,
            pressure_altitude_meter: r.altitude_m,
        }
    }
}

/// Record posted to the collector for one fall.
///
/// Optional groups are all-or-nothing: a group is either fully present or
/// absent from the serialized object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetryPayload {
    pub category: u32,
    pub device_id: u64,
    pub device_token: String,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    #[serde(flatten)]
    pub biometric: Option<BiometricGroup>,
    #[serde(flatten)]
    pub location: Option<LocationGroup>,
    #[serde(flatten)]
    pub pressure: Option<PressureGroup>,
}

impl TelemetryPayload {
    /// Payload with the inertial fields only
    pub fn inertial(identity: &DeviceIdentity, event: &FallEvent) -> Self {
        let accel = event.reading.accel;
        let gyro = event.reading.gyro;
        Self {
            category: FALL_DETECTED,
            device_id: identity.device_id,
            device_token: identity.device_token.clone(),
            accel_x: accel.x,
            accel_y: accel.y,
            accel_z: accel.z,
            gyro_x: gyro.x,
            gyro_y: gyro.y,
            gyro_z: gyro.z,
            biometric: None,
            location: None,
            pressure: None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Build the payload for `event`, reading each auxiliary sensor once.
///
/// A failed auxiliary read only drops that group.
pub fn assemble(
    identity: &DeviceIdentity,
    event: &FallEvent,
    sensors: &mut SensorSuite,
) -> TelemetryPayload {
    let mut payload = TelemetryPayload::inertial(identity, event);

    match sensors.biometric.read() {
        Ok(r) => payload.biometric = Some(r.into()),
        Err(e) => {
            log::debug!("{} omitted: {}", sensors.biometric.name(), e);
        }
    }
    match sensors.location.read() {
        Ok(fix) => payload.location = Some(fix.into()),
        Err(e) => {
            log::debug!("{} omitted: {}", sensors.location.name(), e);
        }
    }
    match sensors.pressure.read() {
        Ok(r) => payload.pressure = Some(r.into()),
        Err(e) => {
            log::debug!("{} omitted: {}", sensors.pressure.name(), e);
        }
    }

    payload
}
