// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use codescan::constants::{GeolocationPolicy, barcode, capture, file_formats, qr};
use std::time::Duration;

#[test]
fn test_policy_values() {
    // Both scanner behaviours exist
    assert_eq!(GeolocationPolicy::ALL.len(), 2);
    assert!(GeolocationPolicy::Strict.blocks_submission());
    assert!(!GeolocationPolicy::BestEffort.blocks_submission());
}

#[test]
fn test_policy_display_matches_config_spelling() {
    for policy in GeolocationPolicy::ALL {
        let quoted = format!("\"{}\"", policy);
        let parsed: GeolocationPolicy = serde_json::from_str(&quoted).unwrap();
        assert_eq!(parsed, policy);
    }
}

#[test]
fn test_geolocation_waits() {
    // The QR scanner waits longer for a fix than the barcode scanner
    assert_eq!(qr::GEOLOCATION_TIMEOUT, Duration::from_secs(10));
    assert_eq!(barcode::GEOLOCATION_TIMEOUT, Duration::from_secs(5));
}

#[test]
fn test_barcode_timing() {
    assert_eq!(barcode::POLL_INTERVAL, Duration::from_millis(500));
    assert_eq!(barcode::FALLBACK_TIMEOUT, Duration::from_secs(10));
}

#[test]
fn test_preferred_capture_size() {
    assert_eq!(
        (capture::PREFERRED_WIDTH, capture::PREFERRED_HEIGHT),
        (1280, 720)
    );
    assert!(capture::READY_TIMEOUT > Duration::ZERO);
}

#[test]
fn test_image_extensions() {
    assert!(file_formats::is_image_extension("png"));
    assert!(file_formats::is_image_extension("JPG"));
    assert!(!file_formats::is_image_extension("mp4"));
}
