//! Diagnostic records and sinks.
//!
//! Every record produced while loading modules or checking data goes to the
//! injected [`DiagnosticSink`]. Error-level records are also queued on the
//! context until the failing operation drains them into its error message.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic record, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Verbose,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Verbose => "verbose",
            Level::Debug => "debug",
        };
        f.write_str(s)
    }
}

/// One queued diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    /// Data or schema path the record is about.
    pub path: Option<String>,
    pub message: String,
    /// Machine-readable tag such as `missing-element`.
    pub app_tag: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(path) = &self.path {
            parts.push(path);
        }
        parts.push(&self.message);
        if let Some(tag) = &self.app_tag {
            parts.push(tag);
        }
        f.write_str(&parts.join(": "))
    }
}

/// Receiver for diagnostic records, injected into a schema context.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, level: Level, message: &str, path: Option<&str>);
}

/// Forwards records to `tracing`, dropping those less severe than
/// `min_level`.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    pub min_level: Level,
}

impl TracingSink {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::Error)
    }
}

impl DiagnosticSink for TracingSink {
    fn record(&self, level: Level, message: &str, path: Option<&str>) {
        if level > self.min_level {
            return;
        }
        let path = path.unwrap_or("");
        match level {
            Level::Error => tracing::error!(path, "{message}"),
            Level::Warning => tracing::warn!(path, "{message}"),
            Level::Verbose => tracing::info!(path, "{message}"),
            Level::Debug => tracing::debug!(path, "{message}"),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String, Option<String>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn records(&self) -> Vec<(Level, String, Option<String>)> {
        self.records.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: Level, message: &str, path: Option<&str>) {
        self.records
            .lock()
            .expect("lock poisoned")
            .push((level, message.to_string(), path.map(str::to_string)));
    }
}

/// Pending error records of one context.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticQueue {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticQueue {
    pub(crate) fn push(&self, diagnostic: Diagnostic) {
        self.entries.lock().expect("lock poisoned").push(diagnostic);
    }

    /// Take every queued record in one lock acquisition.
    ///
    /// The lock is released before the caller formats anything, so a sink
    /// that records again while an error is being built cannot deadlock.
    pub(crate) fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock().expect("lock poisoned"))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_present_parts() {
        let d = Diagnostic {
            level: Level::Error,
            path: Some("/m:types/str1".into()),
            message: "Invalid value".into(),
            app_tag: Some("invalid-value".into()),
        };
        assert_eq!(d.to_string(), "/m:types/str1: Invalid value: invalid-value");

        let d = Diagnostic {
            level: Level::Error,
            path: None,
            message: "bare".into(),
            app_tag: None,
        };
        assert_eq!(d.to_string(), "bare");
    }

    #[test]
    fn queue_drain_empties() {
        let q = DiagnosticQueue::default();
        q.push(Diagnostic {
            level: Level::Error,
            path: None,
            message: "one".into(),
            app_tag: None,
        });
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain().len(), 1);
        assert_eq!(q.len(), 0);
        assert!(q.drain().is_empty());
    }

    #[test]
    fn memory_sink_keeps_records() {
        let sink = MemorySink::new();
        sink.record(Level::Warning, "skipped", Some("/x"));
        assert_eq!(sink.records(), vec![(Level::Warning, "skipped".into(), Some("/x".into()))]);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Error < Level::Warning);
        assert!(Level::Verbose < Level::Debug);
    }
}
