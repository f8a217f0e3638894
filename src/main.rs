//! # FPV Downlink
//!
//! Air-side endpoint of a drone video/telemetry downlink.
//!
//! Pipes a raw H.264 elementary stream from stdin and MAVLink telemetry
//! from the flight controller's serial port onto UDP sockets towards the
//! ground station, forwarding uplink telemetry back to the flight
//! controller. Typical invocation on the air unit:
//!
//! ```text
//! raspivid -t 0 -o - | fpv-downlink /etc/fpv-downlink.toml
//! ```

use anyhow::Result;
use tracing::{info, warn};

mod config;
mod error;
mod link;
mod mavlink;
mod serial;
mod telemetry;
mod video;

use config::Config;
use link::LinkMux;
use serial::FcSerial;

/// Configuration file used when no path argument is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("FPV Downlink v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration; a missing default file is not an error, the
    // built-in defaults target localhost for bench use
    let (config_path, path_given) = match std::env::args().nth(1) {
        Some(path) => (path, true),
        None => (DEFAULT_CONFIG_PATH.to_string(), false),
    };
    let config = if path_given || std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        warn!("No configuration file at {}, using defaults", config_path);
        Config::default()
    };
    info!(
        "Streaming to {} (video:{} telemetry:{} status:{})",
        config.link.target_ip,
        config.link.video_port,
        config.link.telemetry_port,
        config.link.status_port
    );

    // The serial link to the flight controller is mandatory
    let fc_serial = FcSerial::open(&config.serial.device, config.serial.baud_rate)?;
    info!("Flight controller on {}", fc_serial.device_path());

    let mut mux = LinkMux::connect(&config, fc_serial.into_stream(), tokio::io::stdin()).await?;

    let outcome = tokio::select! {
        // run() only returns on a fatal I/O error
        result = mux.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    };

    // Write out any buffered recording from the tail of the flight
    mux.shutdown()?;
    outcome?;
    Ok(())
}
