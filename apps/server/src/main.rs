//! Control Hub Server - Standalone headless host for the control hub.
//!
//! Runs the hub against a loopback player so remote clients can be developed
//! and tested without a real media engine. The loopback player simulates
//! playback and queue progression and reports every change back to the hub.

mod config;
mod player;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use control_hub_core::{ControlHub, PlayerController};
use tokio::signal;

use crate::config::ServerConfig;

/// Control Hub Server - Remote control endpoint for a media player.
#[derive(Parser, Debug)]
#[command(name = "control-hub-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CONTROL_HUB_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Preferred port (overrides config file, 0 = ephemeral).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Let remote clients edit the queue.
    #[arg(short = 'q', long)]
    queue_controllable: bool,

    /// Skip the mDNS announcement.
    #[arg(long)]
    no_announce: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Control Hub Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.queue_controllable {
        config.queue_controllable = true;
    }
    if args.no_announce {
        config.announce = false;
    }

    log::info!(
        "Configuration: port={}, queue_controllable={}, announce={}",
        config.port,
        config.queue_controllable,
        config.announce
    );

    let (player, engine) = player::loopback(config.item_duration_secs);
    let hub = ControlHub::start(config.to_hub_config(), player.clone())
        .await
        .context("Failed to start control hub")?;

    let tick = Duration::from_millis(config.tick_interval_ms.max(1));
    let engine_handle = tokio::spawn(engine.run(hub.clone(), tick));

    for uri in &config.initial_queue {
        player.queue_append(uri);
    }

    match hub.port() {
        Some(port) => log::info!("Control hub {} listening on port {}", hub.name(), port),
        None => log::info!("Control hub {} created inactive", hub.name()),
    }

    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    if let Err(e) = hub.set_active(false).await {
        log::warn!("Error while stopping control hub: {}", e);
    }
    engine_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
