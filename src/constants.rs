// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when no position fix can be obtained
///
/// The two scanner variants disagree here and both behaviours are kept as
/// named modes instead of being folded into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeolocationPolicy {
    /// Report the failure and abort the submission (QR scanner)
    Strict,
    /// Substitute a zero coordinate so submission always goes ahead (barcode scanner)
    BestEffort,
}

impl GeolocationPolicy {
    /// All policies, for listing in help output
    pub const ALL: [GeolocationPolicy; 2] =
        [GeolocationPolicy::Strict, GeolocationPolicy::BestEffort];

    /// Get display name for the policy
    pub fn display_name(&self) -> &'static str {
        match self {
            GeolocationPolicy::Strict => "strict",
            GeolocationPolicy::BestEffort => "best-effort",
        }
    }

    /// Whether a failed fix should block submission
    pub fn blocks_submission(&self) -> bool {
        matches!(self, GeolocationPolicy::Strict)
    }
}

impl std::fmt::Display for GeolocationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Capture request defaults
pub mod capture {
    use super::Duration;

    /// Preferred frame width requested from the camera
    pub const PREFERRED_WIDTH: u32 = 1280;

    /// Preferred frame height requested from the camera
    pub const PREFERRED_HEIGHT: u32 = 720;

    /// How long a freshly opened stream may take to deliver its first frame
    pub const READY_TIMEOUT: Duration = Duration::from_secs(3);

    /// Number of memory-mapped buffers for V4L2 streaming
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Frame pacing for still-image sources (~30fps)
    pub const IMAGE_STREAM_FRAME_DURATION: Duration = Duration::from_millis(33);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Directory scanned for V4L2 capture nodes
    pub const V4L2_DEVICE_DIR: &str = "/dev";
}

/// QR scanner (single-shot) defaults
pub mod qr {
    use super::Duration;

    /// Endpoint receiving QR submissions
    pub const DEFAULT_ENDPOINT: &str = "https://qr-back-s3hl.onrender.com/api/post";

    /// Time allowed for a position fix before giving up
    pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Frames larger than this (in either dimension) are downscaled before decoding
    pub const MAX_DECODE_DIMENSION: u32 = 1280;
}

/// Barcode scanner (continuous) defaults
pub mod barcode {
    use super::Duration;

    /// Endpoint receiving barcode submissions
    pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/api/post";

    /// Time allowed for a position fix before falling back to zero
    pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);

    /// Minimum spacing between two native detection attempts
    pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

    /// Smallest poll interval a configuration may ask for
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// How long the library decoder keeps reading frames before reporting no match
    pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Submission client defaults
pub mod submission {
    use super::Duration;

    /// Upper bound on a single POST round trip
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
}

/// Geolocation defaults
pub mod geolocation {
    /// Desktop id announced to GeoClue (must match a .desktop file for the agent)
    pub const DESKTOP_ID: &str = "codescan";

    /// GeoClue accuracy level for city-level fixes
    pub const GEOCLUE_ACCURACY_CITY: u32 = 4;

    /// GeoClue accuracy level for the most precise fix available (GPS)
    pub const GEOCLUE_ACCURACY_EXACT: u32 = 8;
}

/// Supported still-image file extensions for the file camera source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
