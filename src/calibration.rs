//! Startup orientation calibration.
//!
//! The node is assumed to be at rest while calibrating. The averaged
//! accelerometer vector is taken as gravity in the sensor frame, and the
//! resulting transform rotates it onto the z axis and normalizes it so that
//! resting gravity reads as (0, 0, -1) g afterwards. The detector's impact
//! threshold is expressed in that frame.

use std::time::Duration;

use tokio::time::sleep;

use crate::alert::AlertOutput;
use crate::error::CalibrationError;
use crate::sensors::{InertialSensor, Vec3};

/// Gravity estimates shorter than this are treated as a sensor fault
pub const MIN_GRAVITY_MAGNITUDE: f64 = 1e-6;

/// Roll about x, then pitch, then uniform scale.
///
/// Computed once at bring-up and never changed while the node runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationTransform {
    cr: f64,
    sr: f64,
    cp: f64,
    sp: f64,
    scale: f64,
}

impl OrientationTransform {
    /// Derive the transform from a mean gravity vector in the sensor frame.
    pub fn from_gravity(mean: &Vec3) -> Result<Self, CalibrationError> {
        let magnitude = mean.norm();
        if !(magnitude >= MIN_GRAVITY_MAGNITUDE) {
            return Err(CalibrationError::Degenerate { magnitude });
        }

        let roll = mean.y.atan2(mean.z);
        let pitch = (-mean.x).atan2((mean.y * mean.y + mean.z * mean.z).sqrt());

        Ok(Self {
            cr: roll.cos(),
            sr: roll.sin(),
            cp: pitch.cos(),
            sp: pitch.sin(),
            scale: -1.0 / magnitude,
        })
    }

    pub fn apply(&self, raw: &Vec3) -> Vec3 {
        let x1 = raw.x;
        let y1 = self.cr * raw.y - self.sr * raw.z;
        let z1 = self.sr * raw.y + self.cr * raw.z;

        Vec3::new(
            self.scale * (self.cp * x1 + self.sp * z1),
            self.scale * y1,
            self.scale * (-self.sp * x1 + self.cp * z1),
        )
    }

    /// Roll angle in radians
    pub fn roll(&self) -> f64 {
        self.sr.atan2(self.cr)
    }

    /// Pitch angle in radians
    pub fn pitch(&self) -> f64 {
        self.sp.atan2(self.cp)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// Average `iterations` raw samples spaced by `delay` and build the transform.
///
/// Any failed read aborts calibration.
pub async fn calibrate(
    source: &mut InertialSensor,
    iterations: u32,
    delay: Duration,
) -> Result<OrientationTransform, CalibrationError> {
    if iterations == 0 {
        return Err(CalibrationError::NoIterations);
    }

    let mut sum = Vec3::zeros();
    for index in 0..iterations {
        let reading = source
            .read()
            .map_err(|source| CalibrationError::Read { index, source })?;
        sum += reading.accel;
        sleep(delay).await;
    }

    let mean = sum / f64::from(iterations);
    log::debug!(
        "Gravity estimate: ({:.4}, {:.4}, {:.4})",
        mean.x,
        mean.y,
        mean.z
    );

    OrientationTransform::from_gravity(&mean)
}

/// Keeps the indicator lit for as long as the guard lives
pub struct IndicatorGuard<'a> {
    output: &'a mut dyn AlertOutput,
}

impl<'a> IndicatorGuard<'a> {
    pub fn engage(output: &'a mut dyn AlertOutput) -> Self {
        output.set_indicator(true);
        Self { output }
    }
}

impl Drop for IndicatorGuard<'_> {
    fn drop(&mut self) {
        self.output.set_indicator(false);
    }
}
