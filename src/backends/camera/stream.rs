// SPDX-License-Identifier: GPL-3.0-only

//! Media streams, tracks and the video surface they are bound to
//!
//! A backend hands out a [`MediaStream`]: a set of [`MediaTrack`]s (one
//! capture thread each) plus a watch channel carrying the most recent frame.
//! The [`VideoSurface`] is the consumer side, the equivalent of a video
//! element: it reports readiness and exposes the current frame.

use super::frame_loop::CaptureLoopController;
use super::types::CameraFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Sending half used by capture threads to publish frames
pub type FrameSender = watch::Sender<Option<Arc<CameraFrame>>>;

/// Receiving half, always holding the most recent frame
pub type FrameWatch = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Create an empty frame channel
pub fn frame_channel() -> (FrameSender, FrameWatch) {
    watch::channel(None)
}

/// Lifecycle state of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Capturing
    Live,
    /// Stopped; the device handle has been released
    Ended,
}

/// One capture source inside a stream
pub struct MediaTrack {
    label: String,
    capture: Option<CaptureLoopController>,
    ended: Arc<AtomicBool>,
}

impl MediaTrack {
    /// Wrap a running capture loop as a track
    pub fn new(label: impl Into<String>, capture: CaptureLoopController) -> Self {
        Self {
            label: label.into(),
            capture: Some(capture),
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Track label (device name)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state of the track
    pub fn ready_state(&self) -> TrackState {
        if self.ended.load(Ordering::SeqCst) {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }

    /// Observer that stays valid after the track itself is dropped
    pub fn probe(&self) -> TrackProbe {
        TrackProbe(Arc::clone(&self.ended))
    }

    /// Stop capturing and release the device
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
            info!(track = %self.label, "Track stopped");
        }
        self.ended.store(true, Ordering::SeqCst);
    }
}

impl Drop for MediaTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("label", &self.label)
            .field("state", &self.ready_state())
            .finish()
    }
}

/// Read-only view of a track's state
#[derive(Debug, Clone)]
pub struct TrackProbe(Arc<AtomicBool>);

impl TrackProbe {
    /// State of the observed track
    pub fn state(&self) -> TrackState {
        if self.0.load(Ordering::SeqCst) {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }
}

/// A live stream handed out by a backend
#[derive(Debug)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
    frames: FrameWatch,
}

impl MediaStream {
    /// Assemble a stream from its tracks and frame channel
    pub fn new(tracks: Vec<MediaTrack>, frames: FrameWatch) -> Self {
        Self { tracks, frames }
    }

    /// Tracks of this stream
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// A new receiver for the stream's frames
    pub fn frames(&self) -> FrameWatch {
        self.frames.clone()
    }

    /// Whether any track is still live
    pub fn is_active(&self) -> bool {
        self.tracks
            .iter()
            .any(|t| t.ready_state() == TrackState::Live)
    }

    /// Stop every track, returning how many were live
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for track in &mut self.tracks {
            if track.ready_state() == TrackState::Live {
                stopped += 1;
            }
            track.stop();
        }
        debug!(stopped, "Stopped stream tracks");
        stopped
    }
}

/// Readiness of the surface, mirroring media element ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// No stream bound, or no frame received yet
    HaveNothing,
    /// A current frame is available
    HaveEnoughData,
}

/// Why waiting for the first frame failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceWaitError {
    /// Nothing is bound to the surface
    Unbound,
    /// The stream ended before delivering a frame
    Closed,
    /// No frame arrived within the allowed time
    Timeout(Duration),
}

impl std::fmt::Display for SurfaceWaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceWaitError::Unbound => write!(f, "no stream bound to the video surface"),
            SurfaceWaitError::Closed => write!(f, "stream ended before the first frame"),
            SurfaceWaitError::Timeout(t) => {
                write!(f, "no frame received within {} ms", t.as_millis())
            }
        }
    }
}

impl std::error::Error for SurfaceWaitError {}

/// Display surface a stream is bound to
#[derive(Debug, Default)]
pub struct VideoSurface {
    source: Option<FrameWatch>,
}

impl VideoSurface {
    /// Create an unbound surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a stream's frames to this surface
    pub fn bind(&mut self, frames: FrameWatch) {
        self.source = Some(frames);
    }

    /// Detach the current stream
    pub fn unbind(&mut self) {
        self.source = None;
    }

    /// Whether a stream is bound
    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    /// Current readiness
    pub fn ready_state(&self) -> ReadyState {
        match &self.source {
            Some(rx) if rx.borrow().is_some() => ReadyState::HaveEnoughData,
            _ => ReadyState::HaveNothing,
        }
    }

    /// Most recent frame, if any
    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        self.source.as_ref().and_then(|rx| rx.borrow().clone())
    }

    /// Dimensions of the current frame
    pub fn video_size(&self) -> Option<(u32, u32)> {
        self.current_frame().map(|f| (f.width, f.height))
    }

    /// A receiver for detection loops to follow the surface
    pub fn frames(&self) -> Option<FrameWatch> {
        self.source.clone()
    }

    /// Wait until the surface has a frame to show
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), SurfaceWaitError> {
        let mut rx = self.source.clone().ok_or(SurfaceWaitError::Unbound)?;
        match tokio::time::timeout(timeout, rx.wait_for(|frame| frame.is_some())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(SurfaceWaitError::Closed),
            Err(_) => Err(SurfaceWaitError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::frame_loop::LoopAction;

    fn idle_track(label: &str) -> MediaTrack {
        let capture = CaptureLoopController::start(label, || {
            std::thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });
        MediaTrack::new(label, capture)
    }

    #[test]
    fn test_track_stop_is_idempotent() {
        let mut track = idle_track("test-track");
        let probe = track.probe();
        assert_eq!(probe.state(), TrackState::Live);

        track.stop();
        track.stop();
        assert_eq!(probe.state(), TrackState::Ended);
        assert_eq!(track.ready_state(), TrackState::Ended);
    }

    #[test]
    fn test_dropping_stream_ends_tracks() {
        let (_tx, rx) = frame_channel();
        let stream = MediaStream::new(vec![idle_track("a"), idle_track("b")], rx);
        let probes: Vec<_> = stream.tracks().iter().map(|t| t.probe()).collect();

        drop(stream);
        assert!(probes.iter().all(|p| p.state() == TrackState::Ended));
    }

    #[test]
    fn test_stop_all_counts_live_tracks() {
        let (_tx, rx) = frame_channel();
        let mut stream = MediaStream::new(vec![idle_track("a"), idle_track("b")], rx);

        assert!(stream.is_active());
        assert_eq!(stream.stop_all(), 2);
        assert_eq!(stream.stop_all(), 0);
        assert!(!stream.is_active());
    }

    #[test]
    fn test_surface_ready_state() {
        let (tx, rx) = frame_channel();
        let mut surface = VideoSurface::new();
        assert_eq!(surface.ready_state(), ReadyState::HaveNothing);

        surface.bind(rx);
        assert_eq!(surface.ready_state(), ReadyState::HaveNothing);

        let _ = tx.send(Some(Arc::new(CameraFrame::from_gray(2, 1, vec![0, 0]))));
        assert_eq!(surface.ready_state(), ReadyState::HaveEnoughData);
        assert_eq!(surface.video_size(), Some((2, 1)));

        surface.unbind();
        assert_eq!(surface.ready_state(), ReadyState::HaveNothing);
    }

    #[tokio::test]
    async fn test_wait_until_ready_times_out() {
        let (_tx, rx) = frame_channel();
        let mut surface = VideoSurface::new();
        surface.bind(rx);

        let result = surface.wait_until_ready(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(SurfaceWaitError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_wait_until_ready_reports_closed_stream() {
        let (tx, rx) = frame_channel();
        let mut surface = VideoSurface::new();
        surface.bind(rx);
        drop(tx);

        let result = surface.wait_until_ready(Duration::from_secs(1)).await;
        assert_eq!(result, Err(SurfaceWaitError::Closed));
    }
}
