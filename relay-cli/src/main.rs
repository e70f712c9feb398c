//! # relay-cli
//!
//! CLI peers for testing the camera relay.
//!
//! ## Commands
//!
//! - `camera`: Join a room as SERVER and answer commands
//! - `control`: Join a room as CLIENT and send commands
//! - `status`: Show relay statistics
//!
//! ## Example
//!
//! ```bash
//! # Terminal 1: the camera
//! relay-cli camera --pin 1234 --photo ./sample.jpg
//!
//! # Terminal 2: the remote
//! relay-cli control --pin 1234 take_photo record --out-dir ./captures
//!
//! # Relay health
//! relay-cli status --url http://127.0.0.1:8080
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_types::Command;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{camera, control, status};

const DEFAULT_URL: &str = "ws://127.0.0.1:8080/camera-relay";

/// CLI peers for testing the camera relay.
#[derive(Parser, Debug)]
#[command(name = "relay-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join a room as the camera (SERVER) and answer commands
    Camera {
        /// Relay WebSocket endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// Four-digit room PIN
        #[arg(long, short)]
        pin: String,

        /// Image file sent in answer to TAKE_PHOTO
        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// Join a room as the controller (CLIENT) and send commands
    Control {
        /// Relay WebSocket endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// Four-digit room PIN
        #[arg(long, short)]
        pin: String,

        /// Commands to send, in order (TAKE_PHOTO, RECORD, STOP_RECORD, FLIP_CAMERA)
        #[arg(required = true)]
        commands: Vec<Command>,

        /// Directory where received images are saved
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Seconds to wait for each response
        #[arg(long, default_value = "10")]
        wait_secs: u64,
    },

    /// Show relay statistics
    Status {
        /// Relay base URL (http:// or the ws:// endpoint)
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Camera { url, pin, photo } => {
            camera::run(&url, &pin, photo.as_deref()).await?;
        }
        Commands::Control {
            url,
            pin,
            commands,
            out_dir,
            wait_secs,
        } => {
            control::run(&url, &pin, &commands, out_dir.as_deref(), wait_secs).await?;
        }
        Commands::Status { url } => {
            status::run(&url).await?;
        }
    }

    Ok(())
}
