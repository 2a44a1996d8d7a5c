// SPDX-License-Identifier: MPL-2.0

//! Scanner pages and their building blocks
//!
//! # Architecture
//!
//! - `qr_scanner`: single-shot QR page (start, stop, scan, geolocate)
//! - `barcode_scanner`: continuous PDF417 / Code 128 page with one toggle
//! - `camera_controller`: camera acquisition, readiness and release
//! - `frame_capture`: copy of the current surface frame
//! - `frame_processor`: detectors and the cancellable scan loop
//! - `state`: session flags and the scan state machine
//! - `status`: the status line every step reports through

pub mod barcode_scanner;
pub mod camera_controller;
pub mod frame_capture;
pub mod frame_processor;
pub mod qr_scanner;
pub mod state;
pub mod status;

pub use barcode_scanner::{BarcodeScanPage, DetectorStrategy, ScanTiming};
pub use camera_controller::CameraController;
pub use qr_scanner::QrScanPage;
pub use state::{Controls, ScanEvent, ScanPhase, ScanResult, SessionState};
pub use status::{ConsoleDisplay, Status, StatusDisplay, StatusKind, StatusLog};
