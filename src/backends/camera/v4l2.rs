// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 capture backend
//!
//! Opens `/dev/video*` nodes directly, negotiates one of the formats in
//! [`SourceFormat::PREFERENCE`] and streams memory-mapped buffers from a
//! dedicated capture thread.

use super::format_converters::{SourceFormat, convert_buffer};
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::stream::{FrameSender, MediaStream, MediaTrack, frame_channel};
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, StreamRequest,
};
use super::CameraBackend;
use crate::constants::capture::{FRAME_LOG_INTERVAL, V4L2_BUFFER_COUNT, V4L2_DEVICE_DIR};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Consecutive dequeue failures after which the device is considered gone
const MAX_CONSECUTIVE_FAILURES: u32 = 50;

/// V4L2 camera backend
pub struct V4l2Backend {
    /// Explicit device node, bypassing enumeration
    device: Option<String>,
}

impl V4l2Backend {
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }

    /// Pick the device node for a request
    fn select_device(&self, request: &StreamRequest) -> BackendResult<CameraDevice> {
        if let Some(path) = &self.device {
            return Ok(probe_device(path).unwrap_or_else(|| CameraDevice {
                name: path.clone(),
                path: path.clone(),
                driver: None,
                location: None,
            }));
        }

        let cameras = self.enumerate_cameras();
        cameras
            .iter()
            .find(|c| c.matches_facing(request.facing))
            .or_else(|| cameras.first())
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("no V4L2 capture device found".into()))
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut nodes = video_nodes(Path::new(V4L2_DEVICE_DIR));
        nodes.sort_by_key(|(index, _)| *index);

        let cameras: Vec<CameraDevice> = nodes
            .into_iter()
            .filter_map(|(_, path)| probe_device(&path))
            .collect();

        debug!(count = cameras.len(), "Enumerated V4L2 capture devices");
        cameras
    }

    fn open(&self, request: &StreamRequest) -> BackendResult<MediaStream> {
        if request.audio {
            warn!("Audio capture requested but not supported, ignoring");
        }

        let device = self.select_device(request)?;
        info!(device = %device.path, name = %device.name, request = %request, "Opening V4L2 stream");

        let (sender, frames) = frame_channel();
        let path = device.path.clone();
        let (width, height) = (request.width, request.height);

        let capture = CaptureLoopController::start_with_init(
            &format!("v4l2:{}", device.path),
            move || V4l2Capture::open(&path, width, height, sender),
            |capture: &mut V4l2Capture| capture.next_frame(),
        )?;

        Ok(MediaStream::new(
            vec![MediaTrack::new(device.name, capture)],
            frames,
        ))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn is_available(&self) -> bool {
        self.device.as_deref().is_some_and(|p| Path::new(p).exists())
            || !video_nodes(Path::new(V4L2_DEVICE_DIR)).is_empty()
    }
}

/// Capture state living on the capture thread
struct V4l2Capture {
    stream: MmapStream<'static>,
    format: SourceFormat,
    width: u32,
    height: u32,
    stride: u32,
    sender: FrameSender,
    frame_count: u64,
    failures: u32,
}

impl V4l2Capture {
    fn open(path: &str, width: u32, height: u32, sender: FrameSender) -> BackendResult<Self> {
        let dev = Device::with_path(path)?;

        let (format, negotiated) = negotiate_format(&dev, width, height)?;
        info!(
            device = path,
            width = negotiated.width,
            height = negotiated.height,
            fourcc = %negotiated.fourcc,
            "Negotiated V4L2 format"
        );

        let stream = MmapStream::with_buffers(&dev, Type::VideoCapture, V4L2_BUFFER_COUNT)
            .map_err(|e| {
                BackendError::InitializationFailed(format!("failed to create buffer stream: {}", e))
            })?;

        Ok(Self {
            stream,
            format,
            width: negotiated.width,
            height: negotiated.height,
            stride: negotiated.stride,
            sender,
            frame_count: 0,
            failures: 0,
        })
    }

    /// Dequeue, convert and publish one buffer
    fn next_frame(&mut self) -> LoopAction {
        let (buf, meta) = match self.stream.next() {
            Ok(next) => next,
            Err(e) => {
                self.failures += 1;
                if self.failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!(error = %e, "V4L2 device stopped delivering frames");
                    return LoopAction::Stop;
                }
                std::thread::sleep(Duration::from_millis(10));
                return LoopAction::Continue;
            }
        };
        self.failures = 0;

        let used = (meta.bytesused as usize).min(buf.len());
        let data = if used > 0 { &buf[..used] } else { buf };

        match convert_buffer(self.format, data, self.width, self.height, self.stride) {
            Ok(frame) => {
                self.frame_count += 1;
                if self.frame_count % FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        frame = self.frame_count,
                        sequence = meta.sequence,
                        "V4L2 frame published"
                    );
                }
                if self.sender.send(Some(Arc::new(frame))).is_err() {
                    debug!("All frame receivers dropped, stopping capture");
                    return LoopAction::Stop;
                }
            }
            Err(e) => debug!(error = %e, "Dropping frame that failed to convert"),
        }

        LoopAction::Continue
    }
}

/// Try the preferred formats in order until the driver accepts one
fn negotiate_format(
    dev: &Device,
    width: u32,
    height: u32,
) -> BackendResult<(SourceFormat, v4l::Format)> {
    let mut requested = dev.format()?;

    for candidate in SourceFormat::PREFERENCE {
        requested.width = width;
        requested.height = height;
        requested.fourcc = v4l::FourCC::new(&candidate.fourcc());

        match dev.set_format(&requested) {
            Ok(actual) => {
                if let Some(format) = SourceFormat::from_fourcc(&actual.fourcc.repr) {
                    return Ok((format, actual));
                }
                debug!(wanted = ?candidate, got = %actual.fourcc, "Driver substituted format");
            }
            Err(e) => debug!(format = ?candidate, error = %e, "Format rejected"),
        }
    }

    Err(BackendError::FormatNotSupported(
        "device offers none of MJPG, YUYV, GREY, RGB3".into(),
    ))
}

/// `video<N>` nodes in a directory, with their index
fn video_nodes(dir: &Path) -> Vec<(u32, String)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = name.to_str()?.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, entry.path().to_string_lossy().into_owned()))
        })
        .collect()
}

/// Query a node and keep it only if it can capture video
///
/// Metadata nodes created by UVC devices report the capture capability but
/// expose no formats, so they are filtered out as well.
fn probe_device(path: &str) -> Option<CameraDevice> {
    let dev = Device::with_path(path).ok()?;
    let caps = dev.query_caps().ok()?;

    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return None;
    }
    if dev.enum_formats().map(|f| f.is_empty()).unwrap_or(true) {
        return None;
    }

    Some(CameraDevice {
        name: caps.card,
        path: path.to_string(),
        driver: Some(caps.driver),
        location: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_nodes_filters_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["video0", "video10", "video-meta", "vbi0", "video2"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let mut nodes = video_nodes(dir.path());
        nodes.sort_by_key(|(index, _)| *index);
        let indices: Vec<u32> = nodes.iter().map(|(i, _)| *i).collect();

        assert_eq!(indices, vec![0, 2, 10]);
    }

    #[test]
    fn test_missing_device_dir_yields_nothing() {
        assert!(video_nodes(Path::new("/nonexistent/codescan")).is_empty());
    }

    #[test]
    fn test_explicit_missing_device_fails_to_open() {
        let backend = V4l2Backend::new(Some("/nonexistent/video99".into()));
        let result = backend.open(&StreamRequest::default());
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }
}
