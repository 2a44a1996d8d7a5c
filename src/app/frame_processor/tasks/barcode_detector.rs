// SPDX-License-Identifier: GPL-3.0-only

//! PDF417 / Code 128 detection
//!
//! Two shapes of detector are used by the barcode scanner:
//!
//! - [`BarcodeDetector`]: synchronous, one frame in, zero or more symbols out.
//!   The scan loop polls it on live frames.
//! - [`VideoDecoder`]: reads the live stream itself and resolves once with a
//!   symbol, or with nothing after a timeout.
//!
//! [`RxingDetector`] implements both on top of the rxing crate.

use crate::app::frame_processor::types::{DetectedSymbol, FrameRegion, SymbolFormat};
use crate::backends::camera::{CameraFrame, FrameWatch};
use crate::errors::DetectError;
use futures::future::BoxFuture;
use rxing::{BarcodeFormat, DecodeHintValue, DecodeHints, Exceptions};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Frame-at-a-time symbol detector
pub trait BarcodeDetector: Send + Sync {
    /// Formats this detector looks for
    fn formats(&self) -> &[SymbolFormat];

    /// Search one frame
    ///
    /// An empty vector means nothing was found. Errors are reserved for
    /// malformed input or a failing decoder.
    fn detect(&self, frame: &CameraFrame) -> Result<Vec<DetectedSymbol>, DetectError>;
}

/// Decoder that consumes a live stream until it finds a symbol
pub trait VideoDecoder: Send + Sync {
    /// Read frames until a symbol is decoded or `timeout` elapses
    ///
    /// Resolves with `Ok(None)` on timeout or when the stream ends.
    fn decode_once(
        &self,
        frames: FrameWatch,
        timeout: Duration,
    ) -> BoxFuture<'static, Result<Option<DetectedSymbol>, DetectError>>;
}

/// rxing backed detector restricted to a set of formats
#[derive(Debug, Clone)]
pub struct RxingDetector {
    formats: Vec<SymbolFormat>,
}

impl Default for RxingDetector {
    fn default() -> Self {
        Self::new(vec![SymbolFormat::Pdf417, SymbolFormat::Code128])
    }
}

impl RxingDetector {
    pub fn new(formats: Vec<SymbolFormat>) -> Self {
        Self { formats }
    }

    /// Search a luma plane for any of the configured formats
    ///
    /// Frames without a readable symbol give `Ok(None)`. Only failures of
    /// the decoder itself are errors.
    pub fn detect_luma(
        &self,
        luma: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<DetectedSymbol>, DetectError> {
        let mut hints = DecodeHints::default()
            .with(DecodeHintValue::TryHarder(true))
            .with(DecodeHintValue::PossibleFormats(
                self.formats.iter().map(|f| to_rxing(*f)).collect::<HashSet<_>>(),
            ));

        let result = match rxing::helpers::detect_in_luma_with_hints(
            luma.to_vec(),
            width,
            height,
            None,
            &mut hints,
        ) {
            Ok(result) => result,
            Err(
                Exceptions::NotFoundException(_)
                | Exceptions::ChecksumException(_)
                | Exceptions::FormatException(_),
            ) => return Ok(None),
            Err(e) => return Err(DetectError::Decoder(e.to_string())),
        };

        let Some(found) = from_rxing(result.getBarcodeFormat()) else {
            trace!(format = ?result.getBarcodeFormat(), "Ignoring unexpected symbology");
            return Ok(None);
        };

        let corners: Vec<(f32, f32)> = result.getPoints().iter().map(|p| (p.x, p.y)).collect();
        let symbol = DetectedSymbol::new(found, result.getText())
            .with_bounds(FrameRegion::bounding(&corners, width, height));

        debug!(format = %symbol.format, content = %symbol.content, "Detected barcode");
        Ok(Some(symbol))
    }
}

impl BarcodeDetector for RxingDetector {
    fn formats(&self) -> &[SymbolFormat] {
        &self.formats
    }

    fn detect(&self, frame: &CameraFrame) -> Result<Vec<DetectedSymbol>, DetectError> {
        validate_frame(frame)?;
        let luma = frame.luma();
        Ok(self
            .detect_luma(&luma, frame.width, frame.height)?
            .into_iter()
            .collect())
    }
}

impl VideoDecoder for RxingDetector {
    fn decode_once(
        &self,
        frames: FrameWatch,
        timeout: Duration,
    ) -> BoxFuture<'static, Result<Option<DetectedSymbol>, DetectError>> {
        let detector = Arc::new(self.clone());

        Box::pin(async move {
            match tokio::time::timeout(timeout, search_frames(detector, frames)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(timeout_ms = timeout.as_millis() as u64, "No barcode before timeout");
                    Ok(None)
                }
            }
        })
    }
}

/// Run the detector on every new frame until one yields a symbol
async fn search_frames(
    detector: Arc<RxingDetector>,
    mut frames: FrameWatch,
) -> Result<Option<DetectedSymbol>, DetectError> {
    loop {
        let frame = frames.borrow_and_update().clone();
        if let Some(frame) = frame {
            let worker = Arc::clone(&detector);
            let found = tokio::task::spawn_blocking(move || worker.detect(&frame))
                .await
                .map_err(|e| DetectError::TaskFailed(e.to_string()))??;
            if let Some(symbol) = found.into_iter().next() {
                return Ok(Some(symbol));
            }
        }

        if frames.changed().await.is_err() {
            debug!("Stream ended while decoding");
            return Ok(None);
        }
    }
}

/// Check the buffer covers every row the frame claims
fn validate_frame(frame: &CameraFrame) -> Result<(), DetectError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(DetectError::InvalidFrame("empty frame".into()));
    }
    let row_bytes = frame.width as usize * frame.format.bytes_per_pixel();
    let needed = frame.stride as usize * (frame.height as usize - 1) + row_bytes;
    if frame.data.len() < needed {
        return Err(DetectError::InvalidFrame(format!(
            "{}x{} frame needs {} bytes, got {}",
            frame.width,
            frame.height,
            needed,
            frame.data.len()
        )));
    }
    Ok(())
}

fn to_rxing(format: SymbolFormat) -> BarcodeFormat {
    match format {
        SymbolFormat::Qr => BarcodeFormat::QR_CODE,
        SymbolFormat::Pdf417 => BarcodeFormat::PDF_417,
        SymbolFormat::Code128 => BarcodeFormat::CODE_128,
    }
}

fn from_rxing(format: &BarcodeFormat) -> Option<SymbolFormat> {
    match format {
        BarcodeFormat::QR_CODE => Some(SymbolFormat::Qr),
        BarcodeFormat::PDF_417 => Some(SymbolFormat::Pdf417),
        BarcodeFormat::CODE_128 => Some(SymbolFormat::Code128),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::frame_channel;
    use rxing::{MultiFormatWriter, Writer};

    fn blank_frame() -> CameraFrame {
        CameraFrame::from_gray(64, 32, vec![255; 64 * 32])
    }

    /// Render `text` centred on a white 1280x720 grey frame
    fn rendered_frame(text: &str, format: BarcodeFormat, width: i32, height: i32) -> CameraFrame {
        let matrix = MultiFormatWriter
            .encode(text, &format, width, height)
            .unwrap();
        let (frame_w, frame_h) = (1280u32, 720u32);
        let left = (frame_w - matrix.getWidth()) / 2;
        let top = (frame_h - matrix.getHeight()) / 2;

        let mut luma = vec![255u8; (frame_w * frame_h) as usize];
        for y in 0..matrix.getHeight() {
            for x in 0..matrix.getWidth() {
                if matrix.get(x, y) {
                    luma[((top + y) * frame_w + left + x) as usize] = 0;
                }
            }
        }
        CameraFrame::from_gray(frame_w, frame_h, luma)
    }

    #[test]
    fn test_detects_pdf417_in_wide_frame() {
        let frame = rendered_frame("LIC-0042", BarcodeFormat::PDF_417, 781, 256);
        let found = RxingDetector::default().detect(&frame).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].format, SymbolFormat::Pdf417);
        assert_eq!(found[0].content, "LIC-0042");
    }

    #[test]
    fn test_detects_code128_in_wide_frame() {
        let frame = rendered_frame("LIC-0042", BarcodeFormat::CODE_128, 900, 300);
        let found = RxingDetector::default().detect(&frame).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].format, SymbolFormat::Code128);
        assert_eq!(found[0].content, "LIC-0042");
    }

    #[test]
    fn test_detects_small_pdf417() {
        let frame = rendered_frame("LIC-0042", BarcodeFormat::PDF_417, 409, 184);
        let found = RxingDetector::default().detect(&frame).unwrap();
        assert_eq!(found.first().map(|s| s.content.as_str()), Some("LIC-0042"));
    }

    #[test]
    fn test_unconfigured_format_is_ignored() {
        let frame = rendered_frame("LIC-0042", BarcodeFormat::CODE_128, 900, 300);
        let detector = RxingDetector::new(vec![SymbolFormat::Pdf417]);
        assert_eq!(detector.detect(&frame).unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn test_decode_once_finds_rendered_symbol() {
        let (tx, rx) = frame_channel();
        let frame = rendered_frame("LIC-0042", BarcodeFormat::CODE_128, 900, 300);
        tx.send(Some(Arc::new(frame))).unwrap();

        let result = RxingDetector::default()
            .decode_once(rx, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.map(|s| s.content), Some("LIC-0042".to_string()));
    }

    #[test]
    fn test_blank_frame_yields_nothing() {
        let detector = RxingDetector::default();
        assert_eq!(detector.detect(&blank_frame()).unwrap(), Vec::new());
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = CameraFrame::from_gray(64, 32, vec![0; 100]);
        assert!(matches!(
            RxingDetector::default().detect(&frame),
            Err(DetectError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_default_formats() {
        assert_eq!(
            RxingDetector::default().formats(),
            &[SymbolFormat::Pdf417, SymbolFormat::Code128]
        );
    }

    #[tokio::test]
    async fn test_decode_once_times_out_without_symbol() {
        let (tx, rx) = frame_channel();
        tx.send(Some(Arc::new(blank_frame()))).unwrap();

        let result = RxingDetector::default()
            .decode_once(rx, Duration::from_millis(100))
            .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_decode_once_ends_with_stream() {
        let (tx, rx) = frame_channel();
        drop(tx);

        let result = RxingDetector::default()
            .decode_once(rx, Duration::from_secs(5))
            .await;
        assert_eq!(result, Ok(None));
    }
}
