// SPDX-License-Identifier: GPL-3.0-only
//! Capture threads behind media tracks
//!
//! Every live track owns one named OS thread that pulls frames from its
//! source and publishes them to the stream's surface. Releasing a track
//! always means "raise the stop flag, then join", so once
//! [`CaptureLoopController::stop`] returns the device handle is closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// What a capture step asks of its thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Run another step
    Continue,
    /// End the thread (source exhausted or receivers gone)
    Stop,
}

/// Owner of one capture thread
///
/// # Example
///
/// ```ignore
/// let capture = CaptureLoopController::start("file:code.png", move || {
///     let _ = sender.send(Some(Arc::clone(&frame)));
///     std::thread::sleep(IMAGE_STREAM_FRAME_DURATION);
///     LoopAction::Continue
/// });
/// let track = MediaTrack::new("code.png", capture);
/// ```
pub struct CaptureLoopController {
    label: String,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoopController {
    /// Run `step` repeatedly on a new thread until it returns
    /// [`LoopAction::Stop`] or the controller is stopped
    pub fn start<F>(label: &str, mut step: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        info!(label, "Starting capture thread");
        Self::spawn(label, move |stop_flag| run_steps(&stop_flag, || step()))
    }

    /// Like [`start`](Self::start), but the capture state is opened on the
    /// capture thread first
    ///
    /// The opener blocks until `open` has run, so a device that cannot be
    /// opened is reported here as an `Err` and never becomes a dead track.
    /// The state itself stays on the capture thread.
    pub fn start_with_init<S, E, I, F>(label: &str, open: I, mut step: F) -> Result<Self, E>
    where
        S: 'static,
        E: std::fmt::Display + From<String> + Send + 'static,
        I: FnOnce() -> Result<S, E> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<(), E>>(1);
        let thread_label = label.to_string();

        info!(label, "Opening capture source");
        let mut controller = Self::spawn(label, move |stop_flag| {
            let mut state = match open() {
                Ok(state) => state,
                Err(e) => {
                    warn!(label = %thread_label, error = %e, "Capture source failed to open");
                    let _ = opened_tx.send(Err(e));
                    return;
                }
            };
            let _ = opened_tx.send(Ok(()));
            run_steps(&stop_flag, || step(&mut state));
        });

        match opened_rx.recv() {
            Ok(Ok(())) => Ok(controller),
            Ok(Err(e)) => {
                controller.join();
                Err(e)
            }
            Err(_) => {
                controller.join();
                Err(E::from(format!(
                    "capture thread '{}' exited while opening its source",
                    label
                )))
            }
        }
    }

    fn spawn<B>(label: &str, body: B) -> Self
    where
        B: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_flag = Arc::clone(&stop_flag);
        let thread_label = label.to_string();

        let spawned = thread::Builder::new()
            .name(format!("capture:{}", label))
            .spawn(move || {
                body(thread_flag);
                debug!(label = %thread_label, "Capture thread exiting");
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(label, error = %e, "Failed to spawn capture thread");
                None
            }
        };

        Self {
            label: label.to_string(),
            stop_flag,
            handle,
        }
    }

    /// Whether the capture thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Raise the stop flag and wait for the thread
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.join();
    }

    fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!(label = %self.label, "Capture thread panicked");
        } else {
            debug!(label = %self.label, "Capture thread joined");
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_steps(stop_flag: &AtomicBool, mut step: impl FnMut() -> LoopAction) {
    while !stop_flag.load(Ordering::SeqCst) {
        if step() == LoopAction::Stop {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{CameraFrame, frame_channel};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_step_can_end_the_thread() {
        let steps = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&steps);

        let mut capture = CaptureLoopController::start("finite", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 4 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        capture.join();
        assert_eq!(steps.load(Ordering::SeqCst), 5);
        assert!(!capture.is_running());
    }

    #[test]
    fn test_stop_joins_publishing_thread() {
        let (tx, rx) = frame_channel();
        let frame = Arc::new(CameraFrame::from_gray(2, 2, vec![0; 4]));

        let mut capture = CaptureLoopController::start("publisher", move || {
            let _ = tx.send(Some(Arc::clone(&frame)));
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });
        thread::sleep(Duration::from_millis(30));
        assert!(capture.is_running());

        capture.stop();
        capture.stop();
        assert!(!capture.is_running());
        assert!(rx.borrow().is_some());
        // The sender lived on the thread and is gone with it
        assert!(rx.has_changed().is_err());
    }

    #[test]
    fn test_state_opened_on_capture_thread() {
        let seen = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&seen);

        let mut capture = CaptureLoopController::start_with_init(
            "with-state",
            || Ok::<_, String>(42u32),
            move |state| {
                sink.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
        )
        .expect("open should succeed");

        capture.join();
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_open_failure_reaches_caller() {
        let stepped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stepped);

        let result = CaptureLoopController::start_with_init(
            "broken-device",
            || Err::<(), _>("device busy".to_string()),
            move |_: &mut ()| {
                flag.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        assert_eq!(result.err().as_deref(), Some("device busy"));
        assert!(!stepped.load(Ordering::SeqCst));
    }
}
