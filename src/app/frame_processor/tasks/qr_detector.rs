// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements single-shot QR decoding using the rqrr crate.
//! The captured image is reduced to luma, optionally downscaled, and searched
//! once. The image is never inverted and nothing is retried.

use crate::app::frame_processor::types::{DetectedSymbol, FrameRegion, ImageData, SymbolFormat};
use crate::constants::qr::MAX_DECODE_DIMENSION;
use crate::errors::DetectError;
use tracing::{debug, trace, warn};

/// QR code detector
///
/// Analyzes captured images to detect and decode QR codes.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (larger images are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: MAX_DECODE_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode the first QR code in an image
    ///
    /// The CPU-heavy work runs on a blocking task. `Ok(None)` means no code
    /// was found, which is a normal outcome.
    pub async fn decode(&self, image: ImageData) -> Result<Option<DetectedSymbol>, DetectError> {
        let detector = self.clone();
        tokio::task::spawn_blocking(move || detector.decode_sync(&image))
            .await
            .map_err(|e| {
                warn!(error = %e, "QR detection task panicked");
                DetectError::TaskFailed(e.to_string())
            })
    }

    /// Synchronous decode (runs in blocking task)
    pub fn decode_sync(&self, image: &ImageData) -> Option<DetectedSymbol> {
        let start = std::time::Instant::now();
        let (width, height) = (image.width, image.height);
        if width == 0 || height == 0 {
            return None;
        }

        let luma = image.to_luma();
        let (luma, proc_width, proc_height, scale) =
            if width > self.max_dimension || height > self.max_dimension {
                let scale = (width as f32 / self.max_dimension as f32)
                    .max(height as f32 / self.max_dimension as f32);
                let new_width = ((width as f32 / scale) as u32).max(1);
                let new_height = ((height as f32 / scale) as u32).max(1);
                let downscaled = downscale_luma(&luma, width, height, new_width, new_height);
                (downscaled, new_width, new_height, scale)
            } else {
                (luma, width, height, 1.0)
            };

        trace!(
            proc_width,
            proc_height,
            scale,
            conversion_ms = start.elapsed().as_millis(),
            "Prepared luma image for QR search"
        );

        let row = proc_width as usize;
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(row, proc_height as usize, |x, y| {
                luma[y * row + x]
            });
        let grids = prepared.detect_grids();
        trace!(count = grids.len(), "QR grids located");

        for grid in grids {
            let content = match grid.decode() {
                Ok((_meta, content)) => content,
                Err(e) => {
                    debug!(error = %e, "Failed to decode QR grid");
                    continue;
                }
            };

            let corners: Vec<(f32, f32)> = grid
                .bounds
                .iter()
                .map(|p| (p.x as f32 * scale, p.y as f32 * scale))
                .collect();
            let bounds = FrameRegion::bounding(&corners, width, height);

            debug!(
                content = %content,
                total_ms = start.elapsed().as_millis(),
                "Detected QR code"
            );
            return Some(DetectedSymbol::new(SymbolFormat::Qr, content).with_bounds(bounds));
        }

        None
    }
}

/// Downscale a luma plane using bilinear interpolation
fn downscale_luma(
    luma: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Vec<u8> {
    let src_width = src_width as usize;
    let src_height = src_height as usize;

    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    let get_pixel = |px: usize, py: usize| -> f32 {
        luma.get(py * src_width + px).copied().unwrap_or(0) as f32
    };

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = src_x as usize;
            let y0 = src_y as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let value = get_pixel(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                + get_pixel(x1, y0) * x_frac * (1.0 - y_frac)
                + get_pixel(x0, y1) * (1.0 - x_frac) * y_frac
                + get_pixel(x1, y1) * x_frac * y_frac;

            result.push(value as u8);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Render `text` as an RGBA QR image with a quiet zone
    fn qr_image(text: &str, module_px: u32) -> ImageData {
        let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
        let luma = code
            .render::<image::Luma<u8>>()
            .module_dimensions(module_px, module_px)
            .build();
        let rgba = image::DynamicImage::ImageLuma8(luma).to_rgba8();
        let (width, height) = rgba.dimensions();
        ImageData::new(width, height, rgba.into_raw()).unwrap()
    }

    #[test]
    fn test_decodes_rendered_code() {
        let symbol = QrDetector::new()
            .decode_sync(&qr_image("ABC123", 8))
            .expect("QR code should be found");
        assert_eq!(symbol.content, "ABC123");
        assert_eq!(symbol.format, SymbolFormat::Qr);
        assert!(symbol.bounds.is_some());
    }

    #[test]
    fn test_blank_image_is_not_an_error() {
        let blank = ImageData::new(64, 64, vec![255; 64 * 64 * 4]).unwrap();
        assert!(QrDetector::new().decode_sync(&blank).is_none());
    }

    #[test]
    fn test_downscaled_decode() {
        let image = qr_image("https://example.com/item/42", 16);
        let detector = QrDetector::with_max_dimension(image.width / 2);
        let symbol = detector.decode_sync(&image).expect("QR code should survive downscale");
        assert_eq!(symbol.content, "https://example.com/item/42");
    }

    #[test]
    fn test_downscale_luma() {
        // 4x2 gradient
        let luma = [0u8, 85, 170, 255, 0, 85, 170, 255];
        let result = downscale_luma(&luma, 4, 2, 2, 1);
        assert_eq!(result.len(), 2);

        // First pixel samples around (0,0), second around (2,0)
        assert!(result[0] < 100);
        assert!(result[1] > 150);
    }

    #[tokio::test]
    async fn test_async_decode() {
        let result = QrDetector::new().decode(qr_image("ABC123", 6)).await;
        assert_eq!(result.unwrap().map(|s| s.content).as_deref(), Some("ABC123"));
    }
}
