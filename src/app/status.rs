// SPDX-License-Identifier: GPL-3.0-only

//! Status display
//!
//! Every step of a scan reports through a single text surface. A
//! [`StatusDisplay`] is a pure projection of the latest [`Status`].

use crossterm::style::Stylize;
use std::sync::Mutex;

/// Category of a status line, drives colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Ready,
    Scanning,
    Detected,
    Success,
    Error,
}

/// One status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
    /// Secondary line (scan time, server response)
    pub detail: Option<String>,
}

impl Status {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new(StatusKind::Idle, "")
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Surface status updates are rendered to
pub trait StatusDisplay: Send + Sync {
    fn render(&self, status: &Status);
}

/// Writes one line per update to stdout
#[derive(Debug, Clone, Copy)]
pub struct ConsoleDisplay {
    color: bool,
}

impl ConsoleDisplay {
    /// `color` enables red errors and green successes
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl StatusDisplay for ConsoleDisplay {
    fn render(&self, status: &Status) {
        let line = status.message.as_str();
        match (self.color, status.kind) {
            (true, StatusKind::Error) => println!("{}", line.red()),
            (true, StatusKind::Success) => println!("{}", line.green()),
            (true, StatusKind::Detected) => println!("{}", line.bold()),
            _ => println!("{}", line),
        }
        if let Some(detail) = &status.detail {
            if self.color {
                println!("  {}", detail.as_str().dark_grey());
            } else {
                println!("  {}", detail);
            }
        }
    }
}

/// In-memory status history
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: Mutex<Vec<Status>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status rendered so far, oldest first
    pub fn history(&self) -> Vec<Status> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn latest(&self) -> Option<Status> {
        self.entries.lock().ok().and_then(|e| e.last().cloned())
    }

    /// Messages only, for quick assertions
    pub fn messages(&self) -> Vec<String> {
        self.history().into_iter().map(|s| s.message).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl StatusDisplay for StatusLog {
    fn render(&self, status: &Status) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(status.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_order() {
        let log = StatusLog::new();
        log.render(&Status::new(StatusKind::Ready, "Camera ready to scan"));
        log.render(&Status::error("Error: camera is not active"));

        assert_eq!(
            log.messages(),
            vec!["Camera ready to scan", "Error: camera is not active"]
        );
        assert!(log.latest().is_some_and(|s| s.is_error()));

        log.clear();
        assert!(log.latest().is_none());
    }

    #[test]
    fn test_display_includes_detail() {
        let status = Status::new(StatusKind::Detected, "ABC123").with_detail("Scanned: now");
        assert_eq!(status.to_string(), "ABC123 (Scanned: now)");
    }
}
