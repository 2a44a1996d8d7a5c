// SPDX-License-Identifier: MPL-2.0

//! codescan - camera based code scanner
//!
//! Reads QR codes, PDF417 and Code 128 barcodes from a live camera, tags
//! each decoded code with the current position and POSTs it as JSON to a
//! remote endpoint.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Scanner pages, detectors and session state
//! - [`backends`]: Camera and geolocation backend abstraction
//! - [`submission`]: JSON submission client
//! - [`config`]: User configuration handling
//! - [`errors`]: Error types shared by the pages and the CLI
//!
//! # Example
//!
//! ```ignore
//! // Decode a still image:
//! // codescan decode code.png
//! // Scan barcodes from the first camera:
//! // codescan barcode
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod submission;

// Re-export commonly used types
pub use app::frame_processor::{DetectedSymbol, SymbolFormat};
pub use app::{BarcodeScanPage, QrScanPage};
pub use config::Config;
pub use constants::GeolocationPolicy;
