// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendType {
    /// Video4Linux2 capture device
    #[default]
    V4l2,
    /// Still image served as a live stream
    File,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::File => write!(f, "file"),
        }
    }
}

/// Which way the requested camera should face
///
/// V4L2 does not report mounting position, so backends treat this as a hint
/// and only use it to pick between devices that advertise a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// Parameters for opening a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Preferred camera orientation
    pub facing: FacingMode,
    /// Preferred frame width (hint, the device may pick the nearest size)
    pub width: u32,
    /// Preferred frame height (hint)
    pub height: u32,
    /// Audio capture is never requested by the scanners
    pub audio: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            width: crate::constants::capture::PREFERRED_WIDTH,
            height: crate::constants::capture::PREFERRED_HEIGHT,
            audio: false,
        }
    }
}

impl std::fmt::Display for StreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} ({})", self.width, self.height, self.facing)
    }
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    /// Human readable name (V4L2 card name or file name)
    pub name: String,
    /// Path to the capture node or image file
    pub path: String,
    /// Driver reported by the device, if any
    pub driver: Option<String>,
    /// Mounting position, when known ("front", "back", "external")
    pub location: Option<String>,
}

impl CameraDevice {
    /// Whether this device matches the requested facing mode
    ///
    /// Devices without a known location match either mode.
    pub fn matches_facing(&self, facing: FacingMode) -> bool {
        match (self.location.as_deref(), facing) {
            (None, _) => true,
            (Some("back"), FacingMode::Environment) => true,
            (Some("front"), FacingMode::User) => true,
            (Some("external"), _) => true,
            _ => false,
        }
    }
}

/// Pixel format for published frames
///
/// Backends convert whatever the device delivers into one of these before
/// publishing, so detectors only deal with two layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `stride * height` bytes
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Create a tightly packed RGBA frame
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Create a tightly packed grayscale frame
    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::Gray8,
            stride: width,
            captured_at: Instant::now(),
        }
    }

    /// Luma plane without stride padding (one byte per pixel)
    ///
    /// RGBA is reduced with BT.601 weights; missing rows read as black.
    pub fn luma(&self) -> Vec<u8> {
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = self.stride as usize;
        let bpp = self.format.bytes_per_pixel();

        let mut luma = Vec::with_capacity(width * height);
        for y in 0..height {
            let row_start = y * stride;
            let row_end = row_start + width * bpp;
            let Some(row) = self.data.get(row_start..row_end) else {
                luma.resize(luma.len() + width, 0);
                continue;
            };
            match self.format {
                PixelFormat::Gray8 => luma.extend_from_slice(row),
                PixelFormat::RGBA => luma.extend(row.chunks_exact(4).map(|px| {
                    ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000) as u8
                })),
            }
        }
        luma
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// The system refused access to the device
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Failed to initialize the capture stream
    InitializationFailed(String),
    /// Format not supported
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(msg: String) -> Self {
        BackendError::Other(msg)
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::IoError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_skips_stride_padding() {
        let data: Vec<u8> = vec![
            255, 255, 255, 255, // White
            0, 0, 0, 255, // Black
            9, 9, // stride padding
            0, 0, 0, 255, // Black
            255, 255, 255, 255, // White
            9, 9, // stride padding
        ];
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::RGBA,
            stride: 10,
            captured_at: Instant::now(),
        };

        assert_eq!(frame.luma(), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_luma_pads_truncated_frames() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(vec![10u8, 20].as_slice()),
            format: PixelFormat::Gray8,
            stride: 2,
            captured_at: Instant::now(),
        };

        assert_eq!(frame.luma(), vec![10, 20, 0, 0]);
    }

    #[test]
    fn test_facing_match() {
        let mut device = CameraDevice {
            name: "cam".into(),
            path: "/dev/video0".into(),
            driver: None,
            location: None,
        };
        assert!(device.matches_facing(FacingMode::Environment));

        device.location = Some("front".into());
        assert!(!device.matches_facing(FacingMode::Environment));
        assert!(device.matches_facing(FacingMode::User));
    }

    #[test]
    fn test_io_error_mapping() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            BackendError::from(denied),
            BackendError::PermissionDenied(_)
        ));
    }
}
