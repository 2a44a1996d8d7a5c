// SPDX-License-Identifier: MPL-2.0
// Camera backend with trait-based abstraction

//! Camera backend abstraction
//!
//! Scanners never talk to a device directly. They ask a [`CameraBackend`] for
//! a [`MediaStream`] and bind its frames to a [`VideoSurface`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Page controllers  │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraController   │  ← acquire / release, readiness
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐   ┌──────┐
//!   │ V4L2 │   │ File │
//!   └──────┘   └──────┘
//! ```

pub mod file_source;
pub mod format_converters;
pub mod frame_loop;
pub mod stream;
pub mod types;
pub mod v4l2;

pub use file_source::FileBackend;
pub use frame_loop::{CaptureLoopController, LoopAction};
pub use stream::{
    FrameSender, FrameWatch, MediaStream, MediaTrack, ReadyState, SurfaceWaitError, TrackProbe,
    TrackState, VideoSurface, frame_channel,
};
pub use types::*;
pub use v4l2::V4l2Backend;

use crate::config::CameraConfig;

/// Camera backend trait
///
/// All camera backends must implement this trait to provide:
/// - Device enumeration
/// - Opening a live stream for a request
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open a live stream matching the request
    ///
    /// Every track in the returned stream is live. Dropping the stream (or
    /// calling [`MediaStream::stop_all`]) releases the device.
    ///
    /// # Returns
    /// * `Ok(MediaStream)` - Stream opened, frames will follow
    /// * `Err(BackendError::PermissionDenied)` - The system refused access
    /// * `Err(BackendError)` - No device or it could not be started
    fn open(&self, request: &StreamRequest) -> BackendResult<MediaStream>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend is available on the current system
    fn is_available(&self) -> bool;
}

/// Build the backend selected by the configuration
///
/// An image path always wins over the configured backend type.
pub fn get_backend(config: &CameraConfig) -> BackendResult<Box<dyn CameraBackend>> {
    if let Some(image) = &config.image {
        return Ok(Box::new(FileBackend::new(image.clone())));
    }

    match config.backend {
        CameraBackendType::V4l2 => Ok(Box::new(V4l2Backend::new(config.device.clone()))),
        CameraBackendType::File => Err(BackendError::NotAvailable(
            "file backend selected but no image configured".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_overrides_backend_type() {
        let config = CameraConfig {
            image: Some("/tmp/code.png".into()),
            ..CameraConfig::default()
        };
        let backend = get_backend(&config).expect("file backend");
        assert_eq!(backend.backend_type(), CameraBackendType::File);
    }

    #[test]
    fn test_file_backend_requires_image() {
        let config = CameraConfig {
            backend: CameraBackendType::File,
            ..CameraConfig::default()
        };
        assert!(matches!(
            get_backend(&config),
            Err(BackendError::NotAvailable(_))
        ));
    }
}
