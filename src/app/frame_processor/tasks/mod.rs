// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing tasks
//!
//! This module contains the detector abstractions and their implementations.

pub mod barcode_detector;
pub mod qr_detector;

pub use barcode_detector::{BarcodeDetector, RxingDetector, VideoDecoder};
pub use qr_detector::QrDetector;
