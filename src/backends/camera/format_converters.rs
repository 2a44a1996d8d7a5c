// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for V4L2 capture buffers
//!
//! Devices deliver packed YUV, JPEG or RGB buffers; detectors expect RGBA or
//! plain luma. Everything here produces tightly packed output.

use super::types::{BackendError, BackendResult, CameraFrame};

/// Source layouts the V4L2 backend knows how to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Motion JPEG, one JPEG image per buffer
    Mjpeg,
    /// Packed YUV 4:2:2, Y0 U Y1 V
    Yuyv,
    /// 8-bit greyscale
    Grey,
    /// Packed 24-bit RGB
    Rgb24,
}

impl SourceFormat {
    /// Formats in negotiation order
    pub const PREFERENCE: [SourceFormat; 4] = [
        SourceFormat::Mjpeg,
        SourceFormat::Yuyv,
        SourceFormat::Grey,
        SourceFormat::Rgb24,
    ];

    /// V4L2 FourCC code
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            SourceFormat::Mjpeg => *b"MJPG",
            SourceFormat::Yuyv => *b"YUYV",
            SourceFormat::Grey => *b"GREY",
            SourceFormat::Rgb24 => *b"RGB3",
        }
    }

    /// Parse a FourCC code
    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"MJPG" | b"JPEG" => Some(SourceFormat::Mjpeg),
            b"YUYV" | b"YUY2" => Some(SourceFormat::Yuyv),
            b"GREY" | b"Y800" => Some(SourceFormat::Grey),
            b"RGB3" => Some(SourceFormat::Rgb24),
            _ => None,
        }
    }
}

/// Convert one captured buffer into a publishable frame
///
/// `stride` is the bytes-per-line reported by the driver (ignored for MJPEG).
pub fn convert_buffer(
    format: SourceFormat,
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> BackendResult<CameraFrame> {
    match format {
        SourceFormat::Mjpeg => {
            let image = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                .map_err(|e| BackendError::Other(format!("MJPEG decode failed: {}", e)))?;
            let rgba = image.to_rgba8();
            let (w, h) = rgba.dimensions();
            Ok(CameraFrame::from_rgba(w, h, rgba.into_raw()))
        }
        SourceFormat::Yuyv => {
            let packed = packed_rows(data, width as usize * 2, height as usize, stride as usize)?;
            Ok(CameraFrame::from_rgba(width, height, yuyv_to_rgba(&packed, width, height)))
        }
        SourceFormat::Grey => {
            let packed = packed_rows(data, width as usize, height as usize, stride as usize)?;
            Ok(CameraFrame::from_gray(width, height, packed))
        }
        SourceFormat::Rgb24 => {
            let packed = packed_rows(data, width as usize * 3, height as usize, stride as usize)?;
            Ok(CameraFrame::from_rgba(width, height, rgb24_to_rgba(&packed)))
        }
    }
}

/// Strip row padding from a raw buffer, rejecting buffers missing any row
fn packed_rows(
    data: &[u8],
    row_bytes: usize,
    height: usize,
    stride: usize,
) -> BackendResult<Vec<u8>> {
    let needed = stride.max(row_bytes) * height.saturating_sub(1) + row_bytes;
    if height == 0 || data.len() < needed {
        return Err(BackendError::Other(format!(
            "short capture buffer: {} bytes, expected at least {}",
            data.len(),
            needed
        )));
    }
    Ok(strip_stride(data, row_bytes, height, stride))
}

/// Drop per-row padding, keeping `row_bytes` of every `stride`
fn strip_stride(data: &[u8], row_bytes: usize, height: usize, stride: usize) -> Vec<u8> {
    let stride = stride.max(row_bytes);
    if stride == row_bytes {
        return data[..data.len().min(row_bytes * height)].to_vec();
    }

    let mut packed = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        match data.get(start..start + row_bytes) {
            Some(bytes) => packed.extend_from_slice(bytes),
            None => break,
        }
    }
    packed
}

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            if rgba.len() >= pixel_count * 4 {
                break;
            }
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }

    // Short buffers are padded with black so dimensions stay consistent
    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Convert packed RGB24 to RGBA
pub fn rgb24_to_rgba(data: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(data.len() / 3 * 4);
    for px in data.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    #[test]
    fn test_yuyv_neutral_chroma_is_grey() {
        // Two pixels, Y=16 and Y=235 with neutral chroma
        let data = [16u8, 128, 235, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1);

        assert_eq!(rgba.len(), 8);
        assert_eq!(&rgba[0..4], &[16, 16, 16, 255]);
        assert_eq!(&rgba[4..8], &[235, 235, 235, 255]);
    }

    #[test]
    fn test_yuyv_short_buffer_is_padded() {
        let rgba = yuyv_to_rgba(&[50, 128, 50, 128], 4, 1);
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[8..16], &[0; 8]);
    }

    #[test]
    fn test_grey_buffer_with_stride() {
        let data = [1u8, 2, 0, 0, 3, 4, 0, 0];
        let frame = convert_buffer(SourceFormat::Grey, &data, 2, 2, 4).unwrap();

        assert_eq!(frame.format, PixelFormat::Gray8);
        assert_eq!(frame.luma(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_short_buffers_are_rejected() {
        let half = vec![0u8; 64 * 16];
        assert!(convert_buffer(SourceFormat::Grey, &half, 64, 32, 64).is_err());
        assert!(convert_buffer(SourceFormat::Rgb24, &half, 64, 32, 0).is_err());
        assert!(convert_buffer(SourceFormat::Yuyv, &half, 64, 32, 0).is_err());

        // The last row needs no trailing padding
        let data = [1u8, 2, 0, 0, 3, 4];
        assert!(convert_buffer(SourceFormat::Grey, &data, 2, 2, 4).is_ok());
    }

    #[test]
    fn test_rgb24_to_rgba() {
        let rgba = rgb24_to_rgba(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_invalid_mjpeg_is_an_error() {
        let result = convert_buffer(SourceFormat::Mjpeg, b"not a jpeg", 2, 2, 0);
        assert!(result.is_err());
    }
}
