// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use codescan::config::{Config, DetectorMode};
use std::path::PathBuf;

mod cli;
mod console;

#[derive(Parser)]
#[command(name = "codescan")]
#[command(about = "Scan QR codes and barcodes with a camera and submit them with your location")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Configuration file (default: ~/.config/codescan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Interactive single-shot QR scanner
    Qr {
        /// Capture device node, e.g. /dev/video0
        #[arg(long)]
        camera: Option<String>,

        /// Serve this image instead of a camera
        #[arg(long)]
        image: Option<PathBuf>,

        /// Submission endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Continuous PDF417 / Code 128 scanner
    Barcode {
        /// Capture device node, e.g. /dev/video0
        #[arg(long)]
        camera: Option<String>,

        /// Serve this image instead of a camera
        #[arg(long)]
        image: Option<PathBuf>,

        /// Submission endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Detection path
        #[arg(long, value_enum)]
        detector: Option<DetectorMode>,

        /// Run one scanning session and exit
        #[arg(long)]
        once: bool,
    },

    /// Decode a single image file
    Decode {
        /// Image to decode
        file: PathBuf,

        /// Look for PDF417 / Code 128 instead of QR
        #[arg(long)]
        barcode: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=codescan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    tracing::info!(version = env!("GIT_VERSION"), "codescan starting");

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::List => cli::list_cameras(&config)?,
        Commands::Decode { file, barcode } => cli::decode_file(&file, barcode)?,
        Commands::Qr {
            camera,
            image,
            endpoint,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(cli::run_qr(
                config,
                cli::CameraArgs { camera, image },
                endpoint,
            ))?;
        }
        Commands::Barcode {
            camera,
            image,
            endpoint,
            detector,
            once,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(cli::run_barcode(
                config,
                cli::CameraArgs { camera, image },
                endpoint,
                detector,
                once,
            ))?;
        }
    }

    Ok(())
}
