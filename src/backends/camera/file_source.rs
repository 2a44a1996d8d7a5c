// SPDX-License-Identifier: GPL-3.0-only

//! Still image served as a live camera
//!
//! Loads one image and republishes it at a fixed cadence so the rest of the
//! pipeline behaves exactly as it would with a real device.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::stream::{MediaStream, MediaTrack, frame_channel};
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame, StreamRequest,
};
use super::CameraBackend;
use crate::constants::capture::IMAGE_STREAM_FRAME_DURATION;
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Backend serving a still image file
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Image file served by this backend
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn device_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Load an image file as an RGBA frame
pub fn load_frame(path: &Path) -> BackendResult<CameraFrame> {
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => BackendError::from(io),
        other => BackendError::FormatNotSupported(format!("{}: {}", path.display(), other)),
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path.display(), width, height, "Loaded still image");
    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

impl CameraBackend for FileBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        if !self.is_available() {
            return Vec::new();
        }
        vec![CameraDevice {
            name: self.device_name(),
            path: self.path.display().to_string(),
            driver: None,
            location: Some("external".into()),
        }]
    }

    fn open(&self, request: &StreamRequest) -> BackendResult<MediaStream> {
        let frame = Arc::new(load_frame(&self.path)?);
        info!(
            path = %self.path.display(),
            request = %request,
            "Serving still image as camera stream"
        );

        let (sender, frames) = frame_channel();
        let capture = CaptureLoopController::start(
            &format!("file:{}", self.path.display()),
            move || {
                if sender.send(Some(Arc::clone(&frame))).is_err() {
                    return LoopAction::Stop;
                }
                std::thread::sleep(IMAGE_STREAM_FRAME_DURATION);
                LoopAction::Continue
            },
        );

        Ok(MediaStream::new(
            vec![MediaTrack::new(self.device_name(), capture)],
            frames,
        ))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::File
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
            && self
                .path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(file_formats::is_image_extension)
    }
}
