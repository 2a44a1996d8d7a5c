// SPDX-License-Identifier: GPL-3.0-only

//! Copy the current surface frame into a packed RGBA image

use crate::app::frame_processor::ImageData;
use crate::backends::camera::{CameraFrame, PixelFormat, ReadyState, VideoSurface};
use crate::errors::NotReadyError;
use tracing::trace;

/// Capture the frame currently shown on the surface
///
/// Only valid once the surface has data; no retry.
pub fn capture_frame(surface: &VideoSurface) -> Result<ImageData, NotReadyError> {
    if surface.ready_state() != ReadyState::HaveEnoughData {
        return Err(NotReadyError);
    }
    let frame = surface.current_frame().ok_or(NotReadyError)?;

    let data = copy_rgba_without_stride(&frame);
    trace!(width = frame.width, height = frame.height, "Captured frame");
    ImageData::new(frame.width, frame.height, data).map_err(|_| NotReadyError)
}

/// Copy frame data as RGBA without stride padding
///
/// Grey frames are expanded; rows missing from a short buffer read as black.
fn copy_rgba_without_stride(frame: &CameraFrame) -> Vec<u8> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let bpp = frame.format.bytes_per_pixel();

    let mut result = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        let row_start = y * stride;
        let row_end = row_start + width * bpp;
        match (frame.data.get(row_start..row_end), frame.format) {
            (Some(row), PixelFormat::RGBA) => result.extend_from_slice(row),
            (Some(row), PixelFormat::Gray8) => {
                for &v in row {
                    result.extend_from_slice(&[v, v, v, 255]);
                }
            }
            (None, _) => result.resize(result.len() + width * 4, 0),
        }
    }

    result
}
