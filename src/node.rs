//! Node context and control loop.
//!
//! One tick is one inertial read, one detector update and, on detection, one
//! payload dispatch. Ticks run strictly in sequence. The only concurrent work
//! is the transmission, which owns its payload and is never awaited by the
//! loop.

use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::alert::{alert_forever, AlertOutput};
use crate::calibration::{calibrate, IndicatorGuard, OrientationTransform};
use crate::clock::Clock;
use crate::config::{DeviceIdentity, NodeConfig};
use crate::detector::{DetectorMode, FallDetector, FallEvent};
use crate::error::{NodeError, TransmitError};
use crate::payload::{assemble, TelemetryPayload};
use crate::sensors::{InertialReading, SensorSuite};
use crate::transmit::{dispatch, Transmitter};

/// Everything the node talks to
pub struct NodeHardware {
    pub sensors: SensorSuite,
    pub alert: Box<dyn AlertOutput>,
    pub transmitter: Arc<dyn Transmitter>,
    pub clock: Box<dyn Clock>,
}

#[derive(Debug)]
pub enum TickOutcome {
    Monitoring,
    /// Inertial read failed; the tick was skipped
    ReadFailed,
    FallDetected {
        event: FallEvent,
        payload: TelemetryPayload,
    },
    /// Latched after a detection; nothing was read
    Alerting,
}

/// Summary of a bounded monitoring run
#[derive(Debug, Default)]
pub struct RunReport {
    pub ticks: usize,
    pub read_failures: usize,
    pub dispatches: usize,
    pub detection: Option<FallEvent>,
    pub transmission: Option<JoinHandle<Result<u16, TransmitError>>>,
}

pub struct FallNode {
    config: NodeConfig,
    identity: DeviceIdentity,
    sensors: SensorSuite,
    alert: Box<dyn AlertOutput>,
    transmitter: Arc<dyn Transmitter>,
    clock: Box<dyn Clock>,
    transform: OrientationTransform,
    detector: FallDetector,
}

impl FallNode {
    /// Probe the sensors and calibrate. Any error here is fatal for the node.
    pub async fn bring_up(config: NodeConfig, hardware: NodeHardware) -> Result<Self, NodeError> {
        config.validate()?;

        let NodeHardware {
            mut sensors,
            mut alert,
            transmitter,
            clock,
        } = hardware;

        sensors
            .probe_required()
            .map_err(|(sensor, source)| NodeError::SensorMissing { sensor, source })?;

        alert.set_alert(false);

        log::info!(
            "Calibrating orientation ({} samples, {}ms apart), keep the device still",
            config.calibration_iterations,
            config.calibration_delay_ms
        );
        let transform = {
            let _indicator = IndicatorGuard::engage(alert.as_mut());
            calibrate(
                sensors.imu.as_mut(),
                config.calibration_iterations,
                config.calibration_delay(),
            )
            .await?
        };
        log::info!(
            "Acceleration transform initialized (roll {:.1}°, pitch {:.1}°, scale {:.4})",
            transform.roll().to_degrees(),
            transform.pitch().to_degrees(),
            transform.scale()
        );

        Ok(Self {
            identity: config.identity(),
            detector: FallDetector::new(config.detector()),
            config,
            sensors,
            alert,
            transmitter,
            clock,
            transform,
        })
    }

    pub fn mode(&self) -> DetectorMode {
        self.detector.mode()
    }

    pub fn transform(&self) -> &OrientationTransform {
        &self.transform
    }

    pub fn tick(&mut self) -> TickOutcome {
        let now_ms = self.clock.now_ms();
        self.tick_at(now_ms)
    }

    pub fn tick_at(&mut self, now_ms: u64) -> TickOutcome {
        if self.detector.is_alerting() {
            return TickOutcome::Alerting;
        }

        let raw = match self.sensors.imu.read() {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("Tick {}ms skipped: {}", now_ms, e);
                return TickOutcome::ReadFailed;
            }
        };
        let reading = InertialReading::new(self.transform.apply(&raw.accel), raw.gyro);

        let Some(event) = self.detector.update(now_ms, &reading) else {
            return TickOutcome::Monitoring;
        };

        log::warn!(
            "Fall detected at {} (impact {:.2} g, {}ms after free fall)",
            Utc::now().format("%H:%M:%S"),
            reading.accel.z,
            event.free_fall_to_impact_ms()
        );
        let payload = assemble(&self.identity, &event, &mut self.sensors);
        match payload.to_json() {
            Ok(json) => log::info!("Sending payload: {}", json),
            Err(e) => log::warn!("Payload not printable: {}", e),
        }

        TickOutcome::FallDetected { event, payload }
    }

    /// Monitor for at most `max_ticks` ticks, then return.
    ///
    /// Keeps ticking after a detection so callers can observe the latch.
    pub async fn run_for(&mut self, max_ticks: usize) -> RunReport {
        let mut report = RunReport::default();

        for _ in 0..max_ticks {
            report.ticks += 1;
            match self.tick() {
                TickOutcome::FallDetected { event, payload } => {
                    report.dispatches += 1;
                    report.detection = Some(event);
                    report.transmission = Some(dispatch(Arc::clone(&self.transmitter), payload));
                }
                TickOutcome::ReadFailed => report.read_failures += 1,
                TickOutcome::Monitoring | TickOutcome::Alerting => {}
            }
            sleep(self.config.poll_interval()).await;
        }

        report
    }

    /// Monitor until a fall, then alert until restarted. Never returns.
    pub async fn run(mut self) -> Infallible {
        log::info!("Monitoring every {}ms", self.config.poll_interval_ms);

        loop {
            match self.tick() {
                TickOutcome::FallDetected { payload, .. } => {
                    // Detached; the outcome is only logged
                    let _ = dispatch(Arc::clone(&self.transmitter), payload);
                    break;
                }
                TickOutcome::Alerting => break,
                TickOutcome::Monitoring | TickOutcome::ReadFailed => {}
            }
            sleep(self.config.poll_interval()).await;
        }

        let pattern = self.config.alert_pattern();
        alert_forever(self.alert.as_mut(), pattern).await
    }
}

/// Idle forever after a fatal error. Never returns.
pub async fn halt(reason: impl Display, period: Duration) -> Infallible {
    log::error!("{}", reason);
    log::error!("Node halted, restart required");
    loop {
        sleep(period).await;
    }
}
