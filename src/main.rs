use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use fall_node::alert::LogAlert;
use fall_node::clock::MonotonicClock;
use fall_node::config::NodeConfig;
use fall_node::node::{halt, FallNode, NodeHardware};
use fall_node::sensors::{InertialSensor, SensorSuite};
use fall_node::sim::{
    FallScript, RecordedImu, Recording, SimulatedBarometer, SimulatedBiometrics, SimulatedGps,
    SimulatedImu,
};
use fall_node::transmit::{DryRunTransmitter, HttpTransmitter, Transmitter};

#[derive(Parser, Debug)]
#[command(name = "fall_node")]
#[command(about = "Wearable fall detector: calibrate, monitor, report, alert", long_about = None)]
struct Args {
    /// JSON config file; unset fields keep their defaults
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Collector endpoint (overrides config)
    #[arg(long)]
    collector_url: Option<String>,

    #[arg(long)]
    device_id: Option<u64>,

    #[arg(long)]
    device_token: Option<String>,

    /// Replay a recorded IMU log instead of the simulated sensor
    #[arg(long, value_name = "PATH", conflicts_with = "fall_after")]
    replay: Option<PathBuf>,

    /// Script a fall into the simulated IMU after this many samples
    #[arg(long, value_name = "SAMPLES")]
    fall_after: Option<u64>,

    /// Simulated mounting roll in degrees
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    tilt_roll: f64,

    /// Simulated mounting pitch in degrees
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    tilt_pitch: f64,

    /// Log payloads instead of POSTing them
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(url) = args.collector_url.clone() {
        config.collector_url = url;
    }
    if let Some(id) = args.device_id {
        config.device_id = id;
    }
    if let Some(token) = args.device_token.clone() {
        config.device_token = token;
    }

    log::info!("Fall node starting, device {}", config.device_id);
    log::info!("  Collector: {}", config.collector_url);
    log::info!("  Poll interval: {}ms", config.poll_interval_ms);

    let imu: Box<InertialSensor> = match &args.replay {
        Some(path) => {
            let recording = Recording::load(path)?;
            log::info!("Replaying {} samples from {}", recording.samples.len(), path.display());
            Box::new(RecordedImu::from_recording(recording))
        }
        None => {
            let mut imu = SimulatedImu::tilted(args.tilt_roll, args.tilt_pitch);
            if let Some(after) = args.fall_after {
                imu = imu.with_fall(FallScript::after(after));
            }
            Box::new(imu)
        }
    };

    let transmitter: Arc<dyn Transmitter> = if args.dry_run {
        Arc::new(DryRunTransmitter)
    } else {
        Arc::new(HttpTransmitter::new(config.collector_url.clone(), config.http_timeout())?)
    };

    let hardware = NodeHardware {
        sensors: SensorSuite::new(
            imu,
            Box::new(SimulatedBiometrics::default()),
            Box::new(SimulatedGps::default()),
            Box::new(SimulatedBarometer::default()),
        ),
        alert: Box::new(LogAlert::new()),
        transmitter,
        clock: Box::new(MonotonicClock::new()),
    };

    let halt_poll = config.halt_poll();
    match FallNode::bring_up(config, hardware).await {
        Ok(node) => match node.run().await {},
        Err(e) => match halt(e, halt_poll).await {},
    }
}
