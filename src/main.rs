//! Bhraman - Reactive wander daemon
//!
//! Runs the wander behavior against the simulated host:
//!
//! - **Sensor feeder thread**: Publishes synthetic ToF and bump readings
//!   into the host, which filters them into obstacle events
//! - **Main thread**: Wander loop, selecting on host events and a 50ms tick
//!
//! Ctrl-C stops both and leaves the robot at zero velocity.

use bhraman::host::SensorFeeder;
use bhraman::{BhramanConfig, BhramanError, Result, SimHost, Wander};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG: &str = "bhraman.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `bhraman <path>` (positional)
/// - `bhraman --config <path>` (flag-based)
/// - `bhraman -c <path>` (short flag)
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn load_config() -> Result<BhramanConfig> {
    match parse_config_path() {
        Some(path) => {
            info!("Loading configuration from {}", path);
            BhramanConfig::load(Path::new(&path))
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG);
            BhramanConfig::load(Path::new(DEFAULT_CONFIG))
        }
        None => {
            info!("Using default configuration");
            Ok(BhramanConfig::default())
        }
    }
}

fn run() -> Result<()> {
    let config = load_config()?;

    info!("Bhraman v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Drive window {}-{}s, linear {}-{}, angular ±{}, cool-down {:.1}s",
        config.wander.min_drive_secs,
        config.wander.max_drive_secs,
        config.wander.min_linear,
        config.wander.max_linear,
        config.wander.max_angular,
        config.wander.cooldown_secs
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| BhramanError::Host(format!("Error setting Ctrl-C handler: {}", e)))?;

    let (host, events) = SimHost::new(&config.simulation);
    let mut feeder = SensorFeeder::spawn(&config.simulation, host.handle(), Arc::clone(&running))?;

    let mut wander = Wander::new(config, host);
    wander.start(Instant::now())?;

    info!("Bhraman running. Press Ctrl-C to stop.");
    let result = wander.run(&events, &running);

    feeder.stop();
    result
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bhraman=info")),
        )
        .init();

    if let Err(e) = run() {
        error!("Bhraman failed: {}", e);
        std::process::exit(1);
    }

    info!("Bhraman stopped");
}
