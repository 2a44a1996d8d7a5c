// SPDX-License-Identifier: GPL-3.0-only

//! Continuous PDF417 / Code 128 scanner page
//!
//! A single toggle starts the camera and a background detection task. The
//! first symbol found is latched, geolocated on a best-effort basis and
//! submitted with a UTC timestamp. The camera is released on every path out
//! of a scanning session.

use crate::app::camera_controller::CameraController;
use crate::app::frame_processor::{
    BarcodeDetector, DetectedSymbol, ScanOutcome, ScanTask, VideoDecoder,
};
use crate::app::state::{ScanEvent, SessionState};
use crate::app::status::{Status, StatusDisplay, StatusKind};
use crate::backends::geolocation::Geolocator;
use crate::config::DetectorMode;
use crate::errors::CameraAccessError;
use crate::submission::{SubmissionClient, SubmissionPayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which detection path a session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorStrategy {
    /// Poll the frame detector on live frames
    Native,
    /// One decode-from-video call
    Library,
}

impl DetectorStrategy {
    /// Resolve the configured mode against what is available
    pub fn select(mode: DetectorMode, native_available: bool) -> Self {
        match mode {
            DetectorMode::Auto | DetectorMode::Native if native_available => {
                DetectorStrategy::Native
            }
            DetectorMode::Native => {
                warn!("Native detector requested but unavailable, using library decoder");
                DetectorStrategy::Library
            }
            DetectorMode::Auto | DetectorMode::Library => DetectorStrategy::Library,
        }
    }
}

/// Detection timing for a page
#[derive(Debug, Clone, Copy)]
pub struct ScanTiming {
    /// Minimum spacing between native detection attempts
    pub poll_interval: Duration,
    /// How long the library decoder may read frames
    pub fallback_timeout: Duration,
}

pub struct BarcodeScanPage {
    camera: CameraController,
    session: SessionState,
    native: Option<Arc<dyn BarcodeDetector>>,
    fallback: Arc<dyn VideoDecoder>,
    mode: DetectorMode,
    timing: ScanTiming,
    geolocator: Geolocator,
    client: SubmissionClient,
    display: Arc<dyn StatusDisplay>,
    status: Status,
    scan_task: Option<ScanTask>,
}

impl BarcodeScanPage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: CameraController,
        native: Option<Arc<dyn BarcodeDetector>>,
        fallback: Arc<dyn VideoDecoder>,
        mode: DetectorMode,
        timing: ScanTiming,
        geolocator: Geolocator,
        client: SubmissionClient,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        Self {
            camera,
            session: SessionState::new(),
            native,
            fallback,
            mode,
            timing,
            geolocator,
            client,
            display,
            status: Status::default(),
            scan_task: None,
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

    /// Strategy the next session will use
    pub fn strategy(&self) -> DetectorStrategy {
        DetectorStrategy::select(self.mode, self.native.is_some())
    }

    /// Whether a detection task is pending
    pub fn has_pending_scan(&self) -> bool {
        self.scan_task.is_some()
    }

    fn show(&mut self, status: Status) {
        self.display.render(&status);
        self.status = status;
    }

    fn apply(&mut self, event: ScanEvent) {
        if let Err(e) = self.session.apply(event) {
            debug!(error = %e, "Ignoring scan event");
        }
    }

    /// Start when idle, stop otherwise
    pub async fn toggle(&mut self) {
        if self.session.is_scanning || !self.session.phase.is_idle() {
            self.stop_scanning();
        } else {
            self.start_scanning().await;
        }
    }

    /// Open the camera and start the detection task
    pub async fn start_scanning(&mut self) {
        if !self.session.phase.is_idle() {
            debug!(phase = ?self.session.phase, "Scan already in progress");
            return;
        }

        self.session.code_detected = false;
        self.apply(ScanEvent::Start);
        self.show(Status::new(StatusKind::Scanning, "Starting camera"));

        if let Err(e) = self.camera.start(&mut self.session).await {
            let event = match e {
                CameraAccessError::NotReady(_) => ScanEvent::AcquireTimeout,
                _ => ScanEvent::CameraError,
            };
            self.apply(event);
            self.show(Status::error(format!(
                "Error: could not access the camera ({})",
                e
            )));
            return;
        }

        let Some(frames) = self.camera.surface().frames() else {
            self.release_camera(ScanEvent::CameraError);
            self.show(Status::error("Error: camera stream unavailable"));
            return;
        };

        self.apply(ScanEvent::StreamReady);
        self.session.is_scanning = true;

        let strategy = self.strategy();
        self.scan_task = Some(match (strategy, &self.native) {
            (DetectorStrategy::Native, Some(native)) => {
                ScanTask::spawn_continuous(Arc::clone(native), frames, self.timing.poll_interval)
            }
            _ => ScanTask::spawn_one_shot(
                Arc::clone(&self.fallback),
                frames,
                self.timing.fallback_timeout,
            ),
        });

        info!(?strategy, "Scanning started");
        self.show(Status::new(StatusKind::Scanning, "Scanning for barcodes"));
    }

    /// Cancel detection and release the camera
    pub fn stop_scanning(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.cancel();
        }
        self.release_camera(ScanEvent::Stop);
        self.show(Status::new(StatusKind::Idle, "Scanning stopped"));
    }

    /// Wait for the pending detection task
    ///
    /// Cancellation safe. Never resolves while no task is pending, so it can
    /// sit in a `select!` next to user input.
    pub async fn next_outcome(&mut self) -> ScanOutcome {
        let Some(task) = self.scan_task.as_mut() else {
            return std::future::pending().await;
        };
        let outcome = task.outcome().await;
        self.scan_task = None;
        outcome
    }

    /// React to a finished detection task
    pub async fn handle_outcome(&mut self, outcome: ScanOutcome) {
        self.scan_task = None;
        match outcome {
            ScanOutcome::Detected(symbol) => self.handle_detection(symbol).await,
            ScanOutcome::NoMatch => {
                self.release_camera(ScanEvent::NoMatch);
                self.show(Status::new(
                    StatusKind::Idle,
                    "No barcode detected, press scan to try again",
                ));
            }
            ScanOutcome::Failed(reason) => {
                self.release_camera(ScanEvent::CameraError);
                self.show(Status::error(format!("Error: {}", reason)));
            }
            ScanOutcome::Cancelled => debug!("Scan task cancelled"),
        }
    }

    /// Run one complete session: start, wait, handle
    pub async fn scan_once(&mut self) -> ScanOutcome {
        self.start_scanning().await;
        if !self.session.is_scanning {
            return ScanOutcome::Failed(self.status.message.clone());
        }
        let outcome = self.next_outcome().await;
        self.handle_outcome(outcome.clone()).await;
        outcome
    }

    async fn handle_detection(&mut self, symbol: DetectedSymbol) {
        if self.session.code_detected {
            debug!(content = %symbol.content, "Ignoring detection after latch");
            return;
        }
        self.session.code_detected = true;
        self.apply(ScanEvent::MatchFound);

        let detected_at = chrono::Utc::now();
        let data = self.session.record_result(symbol.content).data.clone();
        info!(format = %symbol.format, content = %data, "Barcode scanned");
        self.show(
            Status::new(StatusKind::Detected, data.clone())
                .with_detail(format!("{} detected", symbol.format)),
        );

        let position = match self.geolocator.get_position().await {
            Ok(position) => position,
            Err(e) => {
                self.release_camera(ScanEvent::Stop);
                self.show(Status::error(format!("Geolocation error: {}", e)));
                return;
            }
        };

        let payload = SubmissionPayload::new(data.clone(), position.latitude, position.longitude)
            .with_timestamp(detected_at);
        self.release_camera(ScanEvent::SubmissionInitiated);

        match self.client.submit(&payload).await {
            Ok(body) => self.show(
                Status::new(StatusKind::Success, data)
                    .with_detail(format!("Server response: {}", body)),
            ),
            Err(e) => self.show(Status::error(format!("Error: {}", e))),
        }
    }

    /// Release the camera and leave the scanning session
    fn release_camera(&mut self, event: ScanEvent) {
        self.camera.stop(&mut self.session);
        self.session.is_scanning = false;
        if !self.session.phase.is_idle() {
            self.apply(event);
        }
    }
}

impl Drop for BarcodeScanPage {
    fn drop(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.cancel();
        }
    }
}
