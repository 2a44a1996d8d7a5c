// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for async frame analysis
//!
//! This module provides the detectors (QR via rqrr, PDF417/Code 128 via
//! rxing) and the background tasks that run them against the live stream.

pub mod scan_loop;
pub mod tasks;
pub mod types;

pub use scan_loop::{MinIntervalGuard, ScanOutcome, ScanTask};
pub use tasks::{BarcodeDetector, QrDetector, RxingDetector, VideoDecoder};
pub use types::{DetectedSymbol, FrameRegion, ImageData, SymbolFormat};
