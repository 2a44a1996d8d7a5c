// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing capture devices
//! - Running the QR and barcode scanner consoles
//! - Decoding a single image file

use crate::console;
use codescan::app::frame_processor::{
    BarcodeDetector, DetectedSymbol, ImageData, QrDetector, RxingDetector, VideoDecoder,
};
use codescan::app::{
    BarcodeScanPage, CameraController, ConsoleDisplay, QrScanPage, ScanTiming, StatusDisplay,
};
use codescan::backends::camera::{self, CameraBackend, V4l2Backend, file_source};
use codescan::backends::geolocation::{Geolocator, PositionOptions, build_provider};
use codescan::config::{CameraConfig, Config, DetectorMode};
use codescan::constants::GeolocationPolicy;
use codescan::errors::AppResult;
use codescan::submission::SubmissionClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Camera selection shared by the scanner commands
#[derive(Debug, Clone, Default)]
pub struct CameraArgs {
    /// Capture node overriding `[camera] device`
    pub camera: Option<String>,
    /// Image served instead of a camera
    pub image: Option<PathBuf>,
}

impl CameraArgs {
    fn apply(self, config: &mut CameraConfig) {
        if let Some(device) = self.camera {
            config.device = Some(device);
        }
        if let Some(image) = self.image {
            config.image = Some(image);
        }
    }
}

/// List all capture devices
pub fn list_cameras(config: &Config) -> AppResult<()> {
    println!("codescan {}", env!("GIT_VERSION"));
    println!();

    let backend = V4l2Backend::new(None);
    let mut cameras = backend.enumerate_cameras();
    if let Some(image) = &config.camera.image {
        cameras.extend(file_source::FileBackend::new(image.clone()).enumerate_cameras());
    }

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(driver) = &camera.driver {
            println!("      Driver: {}", driver);
        }
        if let Some(location) = &camera.location {
            println!("      Location: {}", location);
        }
        println!();
    }

    Ok(())
}

/// Run the interactive QR scanner
pub async fn run_qr(
    mut config: Config,
    camera_args: CameraArgs,
    endpoint: Option<String>,
) -> AppResult<()> {
    camera_args.apply(&mut config.camera);
    if let Some(endpoint) = endpoint {
        config.qr.endpoint = endpoint;
    }

    let camera = build_camera(&config.camera)?;
    let geolocator = build_geolocator(
        &config,
        config.qr.geolocation_policy,
        config.qr.geolocation_timeout(),
    );
    let client = SubmissionClient::new(&config.qr.endpoint, config.submission.request_timeout())?;
    let display: Arc<dyn StatusDisplay> = Arc::new(ConsoleDisplay::new(true));

    info!(endpoint = %config.qr.endpoint, "Starting QR scanner");
    let mut page = QrScanPage::new(
        camera,
        QrDetector::with_max_dimension(config.qr.max_decode_dimension),
        geolocator,
        client,
        display,
    );
    console::run_qr(&mut page).await?;
    Ok(())
}

/// Run the barcode scanner, interactively or for a single session
pub async fn run_barcode(
    mut config: Config,
    camera_args: CameraArgs,
    endpoint: Option<String>,
    detector: Option<DetectorMode>,
    once: bool,
) -> AppResult<()> {
    camera_args.apply(&mut config.camera);
    if let Some(endpoint) = endpoint {
        config.barcode.endpoint = endpoint;
    }
    if let Some(detector) = detector {
        config.barcode.detector = detector;
    }

    let camera = build_camera(&config.camera)?;
    let geolocator = build_geolocator(
        &config,
        config.barcode.geolocation_policy,
        config.barcode.geolocation_timeout(),
    );
    let client = SubmissionClient::new(
        &config.barcode.endpoint,
        config.submission.request_timeout(),
    )?;
    let display: Arc<dyn StatusDisplay> = Arc::new(ConsoleDisplay::new(config.barcode.color));

    let rxing = Arc::new(RxingDetector::new(config.barcode.formats.clone()));
    let native: Arc<dyn BarcodeDetector> = rxing.clone();
    let fallback: Arc<dyn VideoDecoder> = rxing;
    let timing = ScanTiming {
        poll_interval: config.barcode.poll_interval(),
        fallback_timeout: config.barcode.fallback_timeout(),
    };

    info!(
        endpoint = %config.barcode.endpoint,
        detector = ?config.barcode.detector,
        formats = ?config.barcode.formats,
        "Starting barcode scanner"
    );
    let mut page = BarcodeScanPage::new(
        camera,
        Some(native),
        fallback,
        config.barcode.detector,
        timing,
        geolocator,
        client,
        display,
    );

    if once {
        tokio::select! {
            _ = page.scan_once() => {}
            _ = tokio::signal::ctrl_c() => page.stop_scanning(),
        }
        return Ok(());
    }
    console::run_barcode(&mut page).await?;
    Ok(())
}

/// Decode one image file and print the result
pub fn decode_file(path: &Path, barcode: bool) -> AppResult<()> {
    let frame = file_source::load_frame(path)?;
    info!(path = %path.display(), width = frame.width, height = frame.height, barcode, "Decoding image");

    let symbol: Option<DetectedSymbol> = if barcode {
        RxingDetector::default().detect_luma(&frame.luma(), frame.width, frame.height)?
    } else {
        let image = ImageData::new(frame.width, frame.height, frame.data.to_vec())?;
        QrDetector::new().decode_sync(&image)
    };

    match symbol {
        Some(symbol) => println!("{}: {}", symbol.format, symbol.content),
        None => println!("No code detected"),
    }
    Ok(())
}

fn build_camera(config: &CameraConfig) -> AppResult<CameraController> {
    let backend: Box<dyn CameraBackend> = camera::get_backend(config)?;
    Ok(CameraController::new(
        backend,
        config.stream_request(),
        config.ready_timeout(),
    ))
}

fn build_geolocator(config: &Config, policy: GeolocationPolicy, timeout: Duration) -> Geolocator {
    let options = PositionOptions {
        high_accuracy: true,
        timeout,
    };
    Geolocator::new(build_provider(&config.geolocation), options, policy)
}
