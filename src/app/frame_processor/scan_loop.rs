// SPDX-License-Identifier: GPL-3.0-only

//! Cancellable detection tasks driven by the live stream
//!
//! A [`ScanTask`] runs in the background and reports exactly one
//! [`ScanOutcome`] through a oneshot channel. Two flavours exist:
//!
//! - continuous: woken on every new frame, runs the frame detector at most
//!   once per poll interval, stops at the first symbol
//! - one-shot: hands the stream to a [`VideoDecoder`] and reports whatever it
//!   resolves with
//!
//! Cancelling a task never aborts a detection already running on the
//! blocking pool; its result is simply dropped.

use super::tasks::{BarcodeDetector, VideoDecoder};
use super::types::DetectedSymbol;
use crate::backends::camera::FrameWatch;
use crate::errors::DetectError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Enforces a minimum spacing between attempts
#[derive(Debug, Clone)]
pub struct MinIntervalGuard {
    interval: Duration,
    last: Option<Instant>,
}

impl MinIntervalGuard {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an attempt at `now` would respect the interval
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record an attempt at `now` if allowed
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.last = Some(now);
            true
        } else {
            false
        }
    }
}

/// How a scan task ended
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// A symbol was decoded
    Detected(DetectedSymbol),
    /// The decoder gave up without finding anything
    NoMatch,
    /// The detector or the stream failed
    Failed(String),
    /// The task was cancelled before finishing
    Cancelled,
}

/// Handle to a running detection task
#[derive(Debug)]
pub struct ScanTask {
    cancel: CancellationToken,
    result: Option<oneshot::Receiver<ScanOutcome>>,
}

impl ScanTask {
    /// Poll a frame detector on live frames
    pub fn spawn_continuous(
        detector: Arc<dyn BarcodeDetector>,
        frames: FrameWatch,
        poll_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let token = cancel.clone();

        info!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Starting continuous barcode detection"
        );
        tokio::spawn(async move {
            let outcome = poll_frames(detector, frames, poll_interval, token).await;
            debug!(?outcome, "Continuous detection finished");
            let _ = tx.send(outcome);
        });

        Self {
            cancel,
            result: Some(rx),
        }
    }

    /// Run one decode-from-video call
    pub fn spawn_one_shot(
        decoder: Arc<dyn VideoDecoder>,
        frames: FrameWatch,
        timeout: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let token = cancel.clone();

        info!(
            timeout_ms = timeout.as_millis() as u64,
            "Starting one-shot barcode decode"
        );
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => ScanOutcome::Cancelled,
                result = decoder.decode_once(frames, timeout) => match result {
                    Ok(Some(symbol)) => ScanOutcome::Detected(symbol),
                    Ok(None) => ScanOutcome::NoMatch,
                    Err(e) => ScanOutcome::Failed(e.to_string()),
                },
            };
            debug!(?outcome, "One-shot decode finished");
            let _ = tx.send(outcome);
        });

        Self {
            cancel,
            result: Some(rx),
        }
    }

    /// Ask the task to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the task's single outcome
    ///
    /// Cancellation safe: dropping this future before it completes leaves
    /// the outcome available for the next call. Once the outcome has been
    /// taken, further calls return [`ScanOutcome::Cancelled`].
    pub async fn outcome(&mut self) -> ScanOutcome {
        let Some(rx) = self.result.as_mut() else {
            return ScanOutcome::Cancelled;
        };
        let outcome = rx.await.unwrap_or(ScanOutcome::Cancelled);
        self.result = None;
        outcome
    }
}

impl Drop for ScanTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_frames(
    detector: Arc<dyn BarcodeDetector>,
    mut frames: FrameWatch,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> ScanOutcome {
    let mut guard = MinIntervalGuard::new(poll_interval);
    let mut attempts: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return ScanOutcome::Cancelled,
            changed = frames.changed() => {
                if changed.is_err() {
                    return ScanOutcome::Failed("camera stream ended".to_string());
                }
            }
        }

        if !guard.try_acquire(Instant::now()) {
            continue;
        }
        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };

        attempts += 1;
        trace!(attempt = attempts, "Running barcode detection");
        let worker = Arc::clone(&detector);
        let attempt = tokio::task::spawn_blocking(move || worker.detect(&frame));

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ScanOutcome::Cancelled,
            result = attempt => result,
        };

        match result {
            Ok(Ok(symbols)) => {
                if let Some(symbol) = symbols.into_iter().next() {
                    info!(attempts, format = %symbol.format, "Barcode detected");
                    return ScanOutcome::Detected(symbol);
                }
            }
            Ok(Err(DetectError::InvalidFrame(reason))) => {
                debug!(reason = %reason, "Skipping malformed frame");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Barcode detector failed");
                return ScanOutcome::Failed(e.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Barcode detection task panicked");
                return ScanOutcome::Failed(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::types::SymbolFormat;
    use crate::backends::camera::{CameraFrame, frame_channel};
    use crate::errors::DetectError;
    use std::sync::Mutex;

    /// Records attempt times and finds a symbol on the given attempt
    struct Recording {
        calls: Mutex<Vec<Instant>>,
        hit_on: usize,
    }

    impl BarcodeDetector for Recording {
        fn formats(&self) -> &[SymbolFormat] {
            &[SymbolFormat::Pdf417]
        }

        fn detect(&self, _frame: &CameraFrame) -> Result<Vec<DetectedSymbol>, DetectError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            if calls.len() == self.hit_on {
                Ok(vec![DetectedSymbol::new(SymbolFormat::Pdf417, "LIC-0042")])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn publish_frames(tx: crate::backends::camera::FrameSender) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let frame = Arc::new(CameraFrame::from_gray(8, 8, vec![0; 64]));
            while tx.send(Some(Arc::clone(&frame))).is_ok() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    }

    #[test]
    fn test_guard_spacing() {
        let start = Instant::now();
        let mut guard = MinIntervalGuard::new(Duration::from_millis(500));

        assert!(guard.try_acquire(start));
        assert!(!guard.try_acquire(start + Duration::from_millis(100)));
        assert!(!guard.try_acquire(start + Duration::from_millis(499)));
        assert!(guard.try_acquire(start + Duration::from_millis(500)));
        assert!(!guard.is_ready(start + Duration::from_millis(900)));
        assert!(guard.is_ready(start + Duration::from_millis(1000)));
    }

    #[tokio::test]
    async fn test_continuous_respects_interval() {
        let interval = Duration::from_millis(100);
        let detector = Arc::new(Recording {
            calls: Mutex::new(Vec::new()),
            hit_on: 4,
        });
        let (tx, rx) = frame_channel();
        let publisher = publish_frames(tx);

        let mut task = ScanTask::spawn_continuous(detector.clone(), rx, interval);
        let outcome = task.outcome().await;
        publisher.abort();

        assert!(matches!(outcome, ScanOutcome::Detected(ref s) if s.content == "LIC-0042"));
        let calls = detector.calls.lock().unwrap();
        assert_eq!(calls.len(), 4, "polling should stop at the first hit");
        for pair in calls.windows(2) {
            assert!(
                pair[1] - pair[0] >= interval,
                "attempts {:?} apart, expected at least {:?}",
                pair[1] - pair[0],
                interval
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_reports_cancelled() {
        let detector = Arc::new(Recording {
            calls: Mutex::new(Vec::new()),
            hit_on: usize::MAX,
        });
        let (tx, rx) = frame_channel();
        let publisher = publish_frames(tx);

        let mut task = ScanTask::spawn_continuous(detector, rx, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.cancel();

        assert_eq!(task.outcome().await, ScanOutcome::Cancelled);
        assert_eq!(task.outcome().await, ScanOutcome::Cancelled);
        publisher.abort();
    }

    /// Rejects the first frame as malformed, then finds a symbol
    struct MalformedFirst {
        calls: Mutex<usize>,
    }

    impl BarcodeDetector for MalformedFirst {
        fn formats(&self) -> &[SymbolFormat] {
            &[SymbolFormat::Code128]
        }

        fn detect(&self, _frame: &CameraFrame) -> Result<Vec<DetectedSymbol>, DetectError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                Err(DetectError::InvalidFrame("64x32 frame needs 2048 bytes, got 1024".into()))
            } else {
                Ok(vec![DetectedSymbol::new(SymbolFormat::Code128, "LIC-0042")])
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_session_alive() {
        let detector = Arc::new(MalformedFirst {
            calls: Mutex::new(0),
        });
        let (tx, rx) = frame_channel();
        let publisher = publish_frames(tx);

        let mut task = ScanTask::spawn_continuous(detector.clone(), rx, Duration::from_millis(20));
        let outcome = task.outcome().await;
        publisher.abort();

        assert!(matches!(outcome, ScanOutcome::Detected(ref s) if s.content == "LIC-0042"));
        assert_eq!(*detector.calls.lock().unwrap(), 2);
    }

    struct BrokenDecoder;

    impl BarcodeDetector for BrokenDecoder {
        fn formats(&self) -> &[SymbolFormat] {
            &[SymbolFormat::Pdf417]
        }

        fn detect(&self, _frame: &CameraFrame) -> Result<Vec<DetectedSymbol>, DetectError> {
            Err(DetectError::Decoder("IllegalStateException".into()))
        }
    }

    #[tokio::test]
    async fn test_decoder_error_ends_session() {
        let (tx, rx) = frame_channel();
        let publisher = publish_frames(tx);

        let mut task =
            ScanTask::spawn_continuous(Arc::new(BrokenDecoder), rx, Duration::from_millis(20));
        let outcome = task.outcome().await;
        publisher.abort();

        assert_eq!(
            outcome,
            ScanOutcome::Failed("decoder failed: IllegalStateException".to_string())
        );
    }

    #[tokio::test]
    async fn test_stream_end_is_a_failure() {
        let detector = Arc::new(Recording {
            calls: Mutex::new(Vec::new()),
            hit_on: usize::MAX,
        });
        let (tx, rx) = frame_channel();
        drop(tx);

        let mut task = ScanTask::spawn_continuous(detector, rx, Duration::from_millis(20));
        assert!(matches!(task.outcome().await, ScanOutcome::Failed(_)));
    }
}
