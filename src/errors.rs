// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner
//!
//! Page handlers turn every one of these into a status message at their
//! boundary; only the CLI lets them escape, wrapped in [`AppError`].

use crate::backends::camera::{BackendError, SurfaceWaitError};
use crate::backends::geolocation::GeolocationError;
use crate::submission::RemoteError;
use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// The camera could not be acquired
    Camera(CameraAccessError),
    /// Backend failure outside of stream acquisition
    Backend(BackendError),
    /// No position fix (strict policy)
    Geolocation(GeolocationError),
    /// The submission endpoint failed
    Remote(RemoteError),
    /// A detector malfunctioned
    Detect(DetectError),
    /// Configuration errors
    Config(ConfigError),
    /// Filesystem or terminal I/O
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Why the camera could not be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraAccessError {
    /// The system or the user refused access
    Denied(String),
    /// No usable capture device
    NoDevice(String),
    /// The stream opened but never delivered a frame
    NotReady(String),
    /// Any other backend failure
    Failed(String),
}

/// The surface has no frame to capture yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotReadyError;

/// Detector malfunction (as opposed to "no symbol found")
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Frame dimensions and buffer size disagree
    InvalidFrame(String),
    /// The decoding library reported an error other than "not found"
    Decoder(String),
    /// The blocking detection task died
    TaskFailed(String),
}

/// Configuration loading errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The file could not be read
    Read { path: PathBuf, message: String },
    /// The file is not valid TOML for this schema
    Parse { path: PathBuf, message: String },
    /// A value is out of range
    Invalid(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Geolocation(e) => write!(f, "Geolocation error: {}", e),
            AppError::Remote(e) => write!(f, "Submission error: {}", e),
            AppError::Detect(e) => write!(f, "Detection error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraAccessError::Denied(msg) => write!(f, "access denied: {}", msg),
            CameraAccessError::NoDevice(msg) => write!(f, "no camera: {}", msg),
            CameraAccessError::NotReady(msg) => write!(f, "stream not ready: {}", msg),
            CameraAccessError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for NotReadyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video is not ready")
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::InvalidFrame(msg) => write!(f, "invalid frame: {}", msg),
            DetectError::Decoder(msg) => write!(f, "decoder failed: {}", msg),
            DetectError::TaskFailed(msg) => write!(f, "detection task failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config {}: {}", path.display(), message)
            }
            ConfigError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraAccessError {}
impl std::error::Error for NotReadyError {}
impl std::error::Error for DetectError {}
impl std::error::Error for ConfigError {}

impl From<BackendError> for CameraAccessError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(msg) => CameraAccessError::Denied(msg),
            BackendError::DeviceNotFound(msg) | BackendError::NotAvailable(msg) => {
                CameraAccessError::NoDevice(msg)
            }
            other => CameraAccessError::Failed(other.to_string()),
        }
    }
}

impl From<SurfaceWaitError> for CameraAccessError {
    fn from(err: SurfaceWaitError) -> Self {
        CameraAccessError::NotReady(err.to_string())
    }
}

// Conversions from sub-errors to AppError
impl From<CameraAccessError> for AppError {
    fn from(err: CameraAccessError) -> Self {
        AppError::Camera(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<GeolocationError> for AppError {
    fn from(err: GeolocationError) -> Self {
        AppError::Geolocation(err)
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        AppError::Remote(err)
    }
}

impl From<DetectError> for AppError {
    fn from(err: DetectError) -> Self {
        AppError::Detect(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}
