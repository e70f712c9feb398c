//! camera-relay binary entry point.
//!
//! Usage:
//! ```bash
//! camera-relay --config relay.toml
//! PORT=9000 camera-relay
//! camera-relay --help
//! ```

use anyhow::Context;
use camera_relay_server::cleanup::spawn_cleanup_task;
use camera_relay_server::http::health::init_start_time;
use camera_relay_server::{server, CameraRelay, Config};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// PIN rendezvous and WebSocket relay for remote camera control.
#[derive(Debug, Parser)]
#[command(name = "camera-relay", version, about)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "CAMERA_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port. Takes precedence over the config file and `PORT`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config =
        Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let addr = config.bind_address()?;

    init_start_time();
    let relay = Arc::new(CameraRelay::new(config));
    let cleanup = spawn_cleanup_task(relay.clone(), relay.config().cleanup.clone());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        "camera-relay v{} listening on {} (WebSocket endpoint {})",
        env!("CARGO_PKG_VERSION"),
        addr,
        relay.config().server.ws_path
    );

    server::serve(listener, relay, shutdown_signal()).await?;

    cleanup.abort();
    tracing::info!("camera-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl+C received, shutting down"),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
    }
}
