// SPDX-License-Identifier: GPL-3.0-only

//! Scanner configuration
//!
//! Read from TOML, every section optional. Durations are integer
//! milliseconds. Endpoints can be overridden from the environment with
//! `CODESCAN_QR_ENDPOINT` and `CODESCAN_BARCODE_ENDPOINT`.

use crate::app::frame_processor::SymbolFormat;
use crate::backends::camera::{CameraBackendType, FacingMode, StreamRequest};
use crate::constants::{self, GeolocationPolicy};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable overriding the QR endpoint
pub const QR_ENDPOINT_ENV: &str = "CODESCAN_QR_ENDPOINT";

/// Environment variable overriding the barcode endpoint
pub const BARCODE_ENDPOINT_ENV: &str = "CODESCAN_BARCODE_ENDPOINT";

/// Directory name under the user config dir
const CONFIG_DIR_NAME: &str = "codescan";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub qr: QrConfig,
    pub barcode: BarcodeConfig,
    pub geolocation: GeolocationConfig,
    pub submission: SubmissionConfig,
}

/// `[camera]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// Capture node, e.g. `/dev/video2` (first capture device when unset)
    pub device: Option<String>,
    /// Serve this image instead of a camera
    pub image: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    /// How long to wait for the first frame after opening
    pub ready_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            device: None,
            image: None,
            width: constants::capture::PREFERRED_WIDTH,
            height: constants::capture::PREFERRED_HEIGHT,
            facing: FacingMode::default(),
            ready_timeout_ms: constants::capture::READY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl CameraConfig {
    /// Stream request built from this section (video only)
    pub fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            facing: self.facing,
            width: self.width,
            height: self.height,
            audio: false,
        }
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// `[qr]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    pub endpoint: String,
    pub geolocation_policy: GeolocationPolicy,
    pub geolocation_timeout_ms: u64,
    /// Frames larger than this are downscaled before decoding
    pub max_decode_dimension: u32,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::qr::DEFAULT_ENDPOINT.to_string(),
            geolocation_policy: GeolocationPolicy::Strict,
            geolocation_timeout_ms: constants::qr::GEOLOCATION_TIMEOUT.as_millis() as u64,
            max_decode_dimension: constants::qr::MAX_DECODE_DIMENSION,
        }
    }
}

impl QrConfig {
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }
}

/// Which barcode detection path to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Native polling when a detector is available, library fallback otherwise
    #[default]
    Auto,
    /// Always poll with the native detector
    Native,
    /// Always use the one-shot library decoder
    Library,
}

/// `[barcode]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeConfig {
    pub endpoint: String,
    pub geolocation_policy: GeolocationPolicy,
    pub geolocation_timeout_ms: u64,
    /// Minimum spacing between two native detection attempts
    pub poll_interval_ms: u64,
    /// How long the library decoder reads frames before giving up
    pub fallback_timeout_ms: u64,
    pub formats: Vec<SymbolFormat>,
    pub detector: DetectorMode,
    /// Colour-code status lines
    pub color: bool,
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::barcode::DEFAULT_ENDPOINT.to_string(),
            geolocation_policy: GeolocationPolicy::BestEffort,
            geolocation_timeout_ms: constants::barcode::GEOLOCATION_TIMEOUT.as_millis() as u64,
            poll_interval_ms: constants::barcode::POLL_INTERVAL.as_millis() as u64,
            fallback_timeout_ms: constants::barcode::FALLBACK_TIMEOUT.as_millis() as u64,
            formats: vec![SymbolFormat::Pdf417, SymbolFormat::Code128],
            detector: DetectorMode::Auto,
            color: true,
        }
    }
}

impl BarcodeConfig {
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }
}

/// Where position fixes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GeoClue2 over the system bus
    #[default]
    GeoClue,
    /// `latitude`/`longitude` from this section
    Fixed,
    /// No provider; strict scans cannot submit
    None,
}

/// `[geolocation]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub provider: ProviderKind,
    /// Desktop id announced to GeoClue
    pub desktop_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            desktop_id: constants::geolocation::DESKTOP_ID.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            accuracy: None,
        }
    }
}

/// `[submission]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub request_timeout_ms: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: constants::submission::REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SubmissionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Default config file location (`$XDG_CONFIG_HOME/codescan/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read and parse one TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&text).map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply endpoint overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(QR_ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            debug!(endpoint = %endpoint, "QR endpoint overridden from environment");
            self.qr.endpoint = endpoint;
        }
        if let Some(endpoint) = lookup(BARCODE_ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            debug!(endpoint = %endpoint, "Barcode endpoint overridden from environment");
            self.barcode.endpoint = endpoint;
        }
    }

    /// Reject values the scanners cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(
                "camera width and height must be non-zero".into(),
            ));
        }
        if self.barcode.formats.is_empty() {
            return Err(ConfigError::Invalid(
                "barcode.formats must name at least one format".into(),
            ));
        }
        let min_poll = constants::barcode::MIN_POLL_INTERVAL;
        if self.barcode.poll_interval() < min_poll {
            return Err(ConfigError::Invalid(format!(
                "barcode.poll_interval_ms must be at least {}",
                min_poll.as_millis()
            )));
        }
        if self.barcode.fallback_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "barcode.fallback_timeout_ms must be non-zero".into(),
            ));
        }
        if self.qr.endpoint.is_empty() || self.barcode.endpoint.is_empty() {
            return Err(ConfigError::Invalid("endpoints must not be empty".into()));
        }
        Ok(())
    }
}
