//! Telemetry published while checking a property.

use std::sync::Mutex;

/// A published key/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub key: String,
    pub value: String,
}

impl ReportEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Target for generation and shrinking telemetry.
pub trait Reporter: Send + Sync {
    fn publish(&self, key: &str, value: &str);
}

/// Forwards every entry as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn publish(&self, key: &str, value: &str) {
        tracing::info!(target: "forall::report", key, "{}", value);
    }
}

/// Keeps every entry in memory, in publishing order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Value of the last entry published under `key`
    pub fn last(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .rev()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value)
    }
}

impl Reporter for RecordingReporter {
    fn publish(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ReportEntry::new(key, value));
        }
    }
}
