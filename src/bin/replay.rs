use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use serde_json::json;

use fall_node::alert::{alert_cycles, LogAlert};
use fall_node::clock::SteppingClock;
use fall_node::config::NodeConfig;
use fall_node::node::{FallNode, NodeHardware};
use fall_node::sensors::SensorSuite;
use fall_node::sim::{RecordedImu, Recording, SimulatedBarometer, SimulatedBiometrics, SimulatedGps};
use fall_node::transmit::DryRunTransmitter;

/// Run a recorded IMU log through calibration and the detector offline
#[derive(Parser, Debug)]
struct Args {
    /// Recording in {"samples": [{"accel": [..], "gyro": [..]} | null, ...]} form
    #[arg(long)]
    log: PathBuf,

    /// Node config whose thresholds and calibration settings to use
    #[arg(long)]
    config: Option<PathBuf>,

    /// Milliseconds between samples in the log (defaults to the poll interval)
    #[arg(long)]
    step_ms: Option<u64>,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Sound this many alert periods through the log when a fall is found
    #[arg(long, default_value_t = 0)]
    alert_cycles: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    let step_ms = args.step_ms.unwrap_or(config.poll_interval_ms);

    let recording = Recording::load(&args.log)?;
    let total = recording.samples.len();
    let calibration = config.calibration_iterations as usize;
    if total <= calibration {
        bail!(
            "{} has {} samples, need more than {} for calibration",
            args.log.display(),
            total,
            calibration
        );
    }

    // Time comes from the stepping clock, not from sleeping
    config.poll_interval_ms = 0;
    config.calibration_delay_ms = 0;

    let hardware = NodeHardware {
        sensors: SensorSuite::new(
            Box::new(RecordedImu::from_recording(recording)),
            Box::new(SimulatedBiometrics::default()),
            Box::new(SimulatedGps::default()),
            Box::new(SimulatedBarometer::default()),
        ),
        alert: Box::new(LogAlert::new()),
        transmitter: Arc::new(DryRunTransmitter),
        clock: Box::new(SteppingClock::new(0, step_ms)),
    };

    let pattern = config.alert_pattern();
    let mut node = FallNode::bring_up(config, hardware).await?;
    let transform = *node.transform();
    let mut report = node.run_for(total - calibration).await;
    if let Some(handle) = report.transmission.take() {
        handle.await??;
        alert_cycles(&mut LogAlert::new(), pattern, args.alert_cycles).await;
    }

    let detection = report.detection.map(|event| {
        json!({
            "tick_ms": event.tick_ms,
            "free_fall_tick_ms": event.free_fall_tick_ms,
            "free_fall_to_impact_ms": event.free_fall_to_impact_ms(),
            "impact_g": event.reading.accel.z,
        })
    });
    let summary = json!({
        "samples": total,
        "ticks": report.ticks,
        "read_failures": report.read_failures,
        "roll_deg": transform.roll().to_degrees(),
        "pitch_deg": transform.pitch().to_degrees(),
        "scale": transform.scale(),
        "detection": detection,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Replayed {} samples ({} ticks, {} read failures)",
        total, report.ticks, report.read_failures
    );
    println!(
        "Transform: roll {:.1}°, pitch {:.1}°, scale {:.4}",
        transform.roll().to_degrees(),
        transform.pitch().to_degrees(),
        transform.scale()
    );
    match report.detection {
        Some(event) => println!(
            "FALL DETECTED at {}ms (free fall at {}ms, impact {:.2} g)",
            event.tick_ms, event.free_fall_tick_ms, event.reading.accel.z
        ),
        None => println!("No fall detected"),
    }

    Ok(())
}
