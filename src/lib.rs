//! Wearable fall-detection node.
//!
//! Calibrates the accelerometer against gravity, watches for a free-fall
//! followed by an impact, reports the event to a collector and then alerts
//! until restarted.

pub mod alert;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod node;
pub mod payload;
pub mod sensors;
pub mod sim;
pub mod transmit;

#[cfg(test)]
mod testing;
