// SPDX-License-Identifier: GPL-3.0-only

//! Scanner session state
//!
//! One [`SessionState`] per page, owned by the page controller and lent to
//! the camera controller by `&mut`.

use chrono::{DateTime, Local};

/// Scan lifecycle
///
/// ```text
/// Idle      --Start-->                           Acquiring
/// Acquiring --StreamReady-->                     Scanning
/// Acquiring --AcquireTimeout|CameraError|Stop--> Idle
/// Scanning  --MatchFound-->                      Detected
/// Scanning  --Stop|CameraError|NoMatch-->        Idle
/// Detected  --SubmissionInitiated|Stop-->        Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    /// Waiting for the camera stream
    Acquiring,
    /// Stream live, detector running
    Scanning,
    /// A symbol was found; submission pending
    Detected,
}

/// Events driving [`ScanPhase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    Start,
    StreamReady,
    MatchFound,
    Stop,
    CameraError,
    AcquireTimeout,
    SubmissionInitiated,
    NoMatch,
}

/// An event that is not valid in the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ScanPhase,
    pub event: ScanEvent,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} is not valid while {:?}", self.event, self.from)
    }
}

impl std::error::Error for InvalidTransition {}

impl ScanPhase {
    /// Next phase for an event
    pub fn transition(self, event: ScanEvent) -> Result<ScanPhase, InvalidTransition> {
        use ScanEvent::*;
        use ScanPhase::*;

        match (self, event) {
            (Idle, Start) => Ok(Acquiring),
            (Acquiring, StreamReady) => Ok(Scanning),
            (Acquiring, AcquireTimeout | CameraError | Stop) => Ok(Idle),
            (Scanning, MatchFound) => Ok(Detected),
            (Scanning, Stop | CameraError | NoMatch) => Ok(Idle),
            (Detected, SubmissionInitiated | Stop) => Ok(Idle),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ScanPhase::Idle)
    }
}

/// Outcome of a successful decode
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub data: String,
    pub timestamp: DateTime<Local>,
}

impl ScanResult {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            timestamp: Local::now(),
        }
    }
}

/// Enabled flags of the QR page buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start: bool,
    pub stop: bool,
    pub scan: bool,
    pub geolocate: bool,
}

impl Controls {
    /// Camera off: only start (and geolocation) available
    pub const INACTIVE: Controls = Controls {
        start: true,
        stop: false,
        scan: false,
        geolocate: true,
    };

    /// Camera on: stop and scan available
    pub const ACTIVE: Controls = Controls {
        start: false,
        stop: true,
        scan: true,
        geolocate: true,
    };
}

impl Default for Controls {
    fn default() -> Self {
        Controls::INACTIVE
    }
}

/// Per-page session flags
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub camera_active: bool,
    pub is_scanning: bool,
    /// Latch: set once per scanning session when a symbol is reported
    pub code_detected: bool,
    pub last_scan_time: Option<DateTime<Local>>,
    pub last_result: Option<ScanResult>,
    pub phase: ScanPhase,
    pub controls: Controls,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event, leaving the phase unchanged when it is invalid
    pub fn apply(&mut self, event: ScanEvent) -> Result<ScanPhase, InvalidTransition> {
        let next = self.phase.transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Record a decoded result
    pub fn record_result(&mut self, data: impl Into<String>) -> &ScanResult {
        let result = ScanResult::new(data);
        self.last_scan_time = Some(result.timestamp);
        self.last_result.insert(result)
    }

    /// Label of the barcode page's single toggle
    pub fn toggle_label(&self) -> &'static str {
        if self.is_scanning {
            "Stop scanning"
        } else {
            "Start scanning"
        }
    }
}
