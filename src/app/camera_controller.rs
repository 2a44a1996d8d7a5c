// SPDX-License-Identifier: GPL-3.0-only

//! Camera acquisition and release
//!
//! The controller owns the open [`MediaStream`] and the [`VideoSurface`] it
//! is bound to. Session flags live with the page and are passed in, so the
//! controller never holds page state of its own.

use crate::app::state::{Controls, SessionState};
use crate::backends::camera::{CameraBackend, MediaStream, StreamRequest, VideoSurface};
use crate::errors::CameraAccessError;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct CameraController {
    backend: Box<dyn CameraBackend>,
    request: StreamRequest,
    ready_timeout: Duration,
    stream: Option<MediaStream>,
    surface: VideoSurface,
}

impl CameraController {
    pub fn new(
        backend: Box<dyn CameraBackend>,
        request: StreamRequest,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            request,
            ready_timeout,
            stream: None,
            surface: VideoSurface::new(),
        }
    }

    /// Surface the stream is bound to
    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }

    pub fn request(&self) -> &StreamRequest {
        &self.request
    }

    /// Whether a stream is held
    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    /// Acquire the camera and wait until it delivers a frame
    ///
    /// No-op when already active. On failure every track obtained so far is
    /// stopped and the session is left exactly as it was.
    pub async fn start(&mut self, session: &mut SessionState) -> Result<(), CameraAccessError> {
        if session.camera_active && self.is_active() {
            debug!("Camera already active");
            return Ok(());
        }

        // A stream whose tracks all ended is stale
        self.release();

        info!(
            backend = %self.backend.backend_type(),
            request = %self.request,
            "Starting camera"
        );
        let stream = self.backend.open(&self.request).map_err(|e| {
            warn!(error = %e, "Camera access failed");
            CameraAccessError::from(e)
        })?;

        self.surface.bind(stream.frames());
        self.stream = Some(stream);

        if let Err(e) = self.surface.wait_until_ready(self.ready_timeout).await {
            warn!(error = %e, "Camera stream never became ready");
            self.release();
            return Err(e.into());
        }

        session.camera_active = true;
        session.controls = Controls::ACTIVE;
        if let Some((width, height)) = self.surface.video_size() {
            info!(width, height, "Camera ready");
        }
        Ok(())
    }

    /// Release the camera
    ///
    /// Always succeeds. When nothing is held only the control state is reset.
    pub fn stop(&mut self, session: &mut SessionState) {
        self.release();
        session.camera_active = false;
        session.controls = Controls::INACTIVE;
    }

    /// Stop every track and unbind the surface
    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let stopped = stream.stop_all();
            info!(tracks = stopped, "Camera released");
        }
        self.surface.unbind();
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.release();
    }
}
