// SPDX-License-Identifier: GPL-3.0-only

//! Single-shot QR scanner page
//!
//! Four user actions: start the camera, stop it, scan the current frame and
//! show the current position. A successful scan is geolocated under the
//! configured policy and submitted once.

use crate::app::camera_controller::CameraController;
use crate::app::frame_capture::capture_frame;
use crate::app::frame_processor::QrDetector;
use crate::app::state::SessionState;
use crate::app::status::{Status, StatusDisplay, StatusKind};
use crate::backends::geolocation::Geolocator;
use crate::submission::{SubmissionClient, SubmissionPayload};
use std::sync::Arc;
use tracing::{debug, info};

/// Format of the "Scanned:" detail line
const SCAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct QrScanPage {
    camera: CameraController,
    session: SessionState,
    detector: QrDetector,
    geolocator: Geolocator,
    client: SubmissionClient,
    display: Arc<dyn StatusDisplay>,
    status: Status,
}

impl QrScanPage {
    pub fn new(
        camera: CameraController,
        detector: QrDetector,
        geolocator: Geolocator,
        client: SubmissionClient,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        Self {
            camera,
            session: SessionState::new(),
            detector,
            geolocator,
            client,
            display,
            status: Status::default(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Latest status shown
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    fn show(&mut self, status: Status) {
        self.display.render(&status);
        self.status = status;
    }

    /// Start the camera
    pub async fn start_camera(&mut self) {
        match self.camera.start(&mut self.session).await {
            Ok(()) => self.show(Status::new(StatusKind::Ready, "Camera ready to scan")),
            Err(e) => self.show(Status::error(format!(
                "Error: could not access the camera ({})",
                e
            ))),
        }
    }

    /// Stop the camera, showing the last code if there is one
    pub fn stop_camera(&mut self) {
        self.camera.stop(&mut self.session);
        let message = match &self.session.last_result {
            Some(result) => format!("Last code: {}", result.data),
            None => "Camera stopped".to_string(),
        };
        self.show(Status::new(StatusKind::Idle, message));
    }

    /// Decode the current frame once and submit the result
    pub async fn scan(&mut self) {
        if !self.session.camera_active {
            self.show(Status::error("Error: camera is not active"));
            return;
        }

        let image = match capture_frame(self.camera.surface()) {
            Ok(image) => image,
            Err(e) => {
                debug!(error = %e, "Scan requested before video was ready");
                self.show(Status::error("Error: video is not ready"));
                return;
            }
        };

        let symbol = match self.detector.decode(image).await {
            Ok(Some(symbol)) => symbol,
            Ok(None) => {
                self.show(Status::new(StatusKind::Scanning, "No QR code detected"));
                return;
            }
            Err(e) => {
                self.show(Status::error(format!(
                    "Error: could not process the QR code ({})",
                    e
                )));
                return;
            }
        };

        let result = self.session.record_result(symbol.content);
        let data = result.data.clone();
        let scanned = format!("Scanned: {}", result.timestamp.format(SCAN_TIME_FORMAT));
        info!(content = %data, "QR code scanned");
        self.show(Status::new(StatusKind::Detected, data.clone()).with_detail(scanned));

        self.submit(data).await;
    }

    /// Geolocate and POST one decoded code
    async fn submit(&mut self, data: String) {
        let position = match self.geolocator.get_position().await {
            Ok(position) => position,
            Err(e) => {
                self.show(Status::error(format!("Geolocation error: {}", e)));
                return;
            }
        };

        let payload = SubmissionPayload::new(data.clone(), position.latitude, position.longitude);
        match self.client.submit(&payload).await {
            Ok(body) => self.show(
                Status::new(StatusKind::Success, data)
                    .with_detail(format!("Server response: {}", body)),
            ),
            Err(e) => self.show(Status::error(format!("Error querying: {}", e))),
        }
    }

    /// Show the current position
    pub async fn geolocate(&mut self) {
        match self.geolocator.get_position().await {
            Ok(position) => self.show(Status::new(StatusKind::Success, position.to_string())),
            Err(e) => self.show(Status::error(format!("Geolocation error: {}", e))),
        }
    }
}
