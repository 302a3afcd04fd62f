//! Shared fixtures for the blobroute test suites.
//!
//! [`RecordingLog`] and [`RecordingNotifier`] capture what route resolution
//! writes so tests can assert on exact messages. [`scratch_file`] creates a
//! file with known contents inside a temporary directory.

#![allow(clippy::missing_panics_doc)]

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use logging::{LogLevel, Notifier, TransferLog};
use tempfile::TempDir;

/// One line captured by [`RecordingLog`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity the line was logged at.
    pub level: LogLevel,
    /// Source identifier passed with the line.
    pub source: String,
    /// Destination passed with the line.
    pub destination: String,
    /// Message text.
    pub message: String,
}

/// [`TransferLog`] that keeps every accepted line in memory.
#[derive(Debug)]
pub struct RecordingLog {
    threshold: LogLevel,
    entries: Mutex<Vec<LogEntry>>,
    should_log_calls: AtomicUsize,
}

impl RecordingLog {
    /// Accepts lines at `threshold` or more severe.
    #[must_use]
    pub const fn new(threshold: LogLevel) -> Self {
        Self {
            threshold,
            entries: Mutex::new(Vec::new()),
            should_log_calls: AtomicUsize::new(0),
        }
    }

    /// Captured lines, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("log mutex poisoned").clone()
    }

    /// Captured message texts, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|entry| entry.message).collect()
    }

    /// Captured message texts logged at `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }

    /// Number of times [`TransferLog::should_log`] was asked.
    pub fn should_log_calls(&self) -> usize {
        self.should_log_calls.load(Ordering::SeqCst)
    }
}

impl TransferLog for RecordingLog {
    fn should_log(&self, level: LogLevel) -> bool {
        self.should_log_calls.fetch_add(1, Ordering::SeqCst);
        level.enabled_at(self.threshold)
    }

    fn log_transfer_info(&self, level: LogLevel, source: &str, destination: &str, message: &str) {
        if !level.enabled_at(self.threshold) {
            return;
        }
        self.entries.lock().expect("log mutex poisoned").push(LogEntry {
            level,
            source: source.to_owned(),
            destination: destination.to_owned(),
            message: message.to_owned(),
        });
    }
}

/// [`Notifier`] that keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices delivered so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push(message.to_owned());
    }
}

/// Creates `name` with `contents` in a fresh temporary directory.
///
/// The directory is removed when the returned guard drops.
pub fn scratch_file(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write scratch file");
    (dir, path)
}
