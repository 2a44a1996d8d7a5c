// SPDX-License-Identifier: MPL-2.0

//! Core types for frame processing results
//!
//! These types carry frames into the detectors and decoded symbols back out
//! to the page controllers.

use crate::errors::DetectError;
use serde::{Deserialize, Serialize};

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
/// This allows easy transformation to screen coordinates regardless of
/// the actual frame size or display scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }

    /// Bounding box of a set of corner points, in pixels
    pub fn bounding(points: &[(f32, f32)], frame_width: u32, frame_height: u32) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
        for &(x, y) in &points[1..] {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let min_x = min_x.clamp(0.0, frame_width as f32);
        let min_y = min_y.clamp(0.0, frame_height as f32);
        let max_x = max_x.clamp(0.0, frame_width as f32);
        let max_y = max_y.clamp(0.0, frame_height as f32);

        Some(Self::from_pixels(
            min_x as u32,
            min_y as u32,
            (max_x - min_x) as u32,
            (max_y - min_y) as u32,
            frame_width,
            frame_height,
        ))
    }
}

/// Tightly packed RGBA pixels of one frame
///
/// The copy a canvas `getImageData` call would produce: `width * height * 4`
/// bytes, rows back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Wrap RGBA pixels, checking the buffer size
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, DetectError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(DetectError::InvalidFrame(format!(
                "{}x{} RGBA needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// BT.601 luma plane
    pub fn to_luma(&self) -> Vec<u8> {
        self.data
            .chunks_exact(4)
            .map(|px| ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000) as u8)
            .collect()
    }
}

/// Symbologies the scanners understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolFormat {
    Qr,
    Pdf417,
    Code128,
}

impl SymbolFormat {
    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            SymbolFormat::Qr => "QR",
            SymbolFormat::Pdf417 => "PDF417",
            SymbolFormat::Code128 => "Code 128",
        }
    }
}

impl std::fmt::Display for SymbolFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A decoded symbol
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSymbol {
    pub format: SymbolFormat,
    /// Raw text content
    pub content: String,
    /// Location in the frame, when the decoder reports one
    pub bounds: Option<FrameRegion>,
}

impl DetectedSymbol {
    pub fn new(format: SymbolFormat, content: impl Into<String>) -> Self {
        Self {
            format,
            content: content.into(),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Option<FrameRegion>) -> Self {
        self.bounds = bounds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(100, 50, 200, 100, 1000, 500);
        assert!((region.x - 0.1).abs() < 0.001);
        assert!((region.y - 0.1).abs() < 0.001);
        assert!((region.width - 0.2).abs() < 0.001);
        assert!((region.height - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_bounding_clamps_to_frame() {
        let region = FrameRegion::bounding(&[(-10.0, 20.0), (60.0, 80.0), (30.0, 140.0)], 100, 100)
            .expect("non-empty points");
        assert_eq!(region.x, 0.0);
        assert!((region.y - 0.2).abs() < 0.001);
        assert!((region.width - 0.6).abs() < 0.001);
        assert!((region.height - 0.8).abs() < 0.001);
        assert!(FrameRegion::bounding(&[], 100, 100).is_none());
    }

    #[test]
    fn test_image_data_rejects_wrong_size() {
        assert!(ImageData::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            ImageData::new(2, 2, vec![0; 15]),
            Err(DetectError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_symbol_format_serde_names() {
        #[derive(Deserialize)]
        struct Formats {
            formats: Vec<SymbolFormat>,
        }
        let parsed: Formats = toml::from_str(r#"formats = ["pdf417", "code128", "qr"]"#).unwrap();
        assert_eq!(
            parsed.formats,
            vec![SymbolFormat::Pdf417, SymbolFormat::Code128, SymbolFormat::Qr]
        );
    }
}
