//! Append-only event log, persisted wholesale at shutdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::write_atomic;

/// Kinds of recorded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The state machine decided an instance must leave the upstream set.
    DegradationConfirmed,
    /// The instance's entry was actually disabled.
    RemovedFromUpstream,
    /// A removed instance reported a healthy value.
    HealthyAgain,
    /// The instance's entry was actually restored.
    RestoredToUpstream,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::DegradationConfirmed => "DEGRADATION_CONFIRMED",
            EventKind::RemovedFromUpstream => "REMOVED_FROM_UPSTREAM",
            EventKind::HealthyAgain => "HEALTHY_AGAIN",
            EventKind::RestoredToUpstream => "RESTORED_TO_UPSTREAM",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Wall-clock time, ISO-8601.
    pub ts: String,
    /// Same instant as seconds since the Unix epoch.
    pub epoch: f64,
    pub event: EventKind,
    pub instance: String,
    pub detail: String,
}

impl EventRecord {
    pub fn at(now: DateTime<Utc>, event: EventKind, instance: &str, detail: &str) -> Self {
        Self {
            ts: now.to_rfc3339(),
            epoch: now.timestamp_micros() as f64 / 1_000_000.0,
            event,
            instance: instance.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Errors that can occur while persisting the log.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to serialize event log: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write event log to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// In-process, insertion-ordered event log.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    output: Option<PathBuf>,
    flushed: bool,
}

impl EventLog {
    /// A log that is never persisted unless flushed explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that persists to `path` at shutdown, or on drop if shutdown
    /// never flushed it.
    pub fn with_output(path: impl Into<PathBuf>) -> Self {
        Self {
            records: Vec::new(),
            output: Some(path.into()),
            flushed: false,
        }
    }

    /// Append an event and narrate it.
    pub fn record(&mut self, kind: EventKind, instance: &str, detail: &str) {
        tracing::info!(event = %kind, instance = %instance, detail = %detail, "EVENT");
        self.records.push(EventRecord::at(Utc::now(), kind, instance, detail));
        self.flushed = false;
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Write every record to `path` as one JSON array, replacing any prior
    /// content. Returns the number of records written.
    pub fn flush(&mut self, path: &Path) -> Result<usize, EventLogError> {
        let json = serde_json::to_vec_pretty(&self.records)?;
        write_atomic(path, &json).map_err(|source| EventLogError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        self.flushed = true;
        Ok(self.records.len())
    }

    /// Flush to the configured output. An empty log writes nothing. A failed
    /// write is not retried on drop.
    pub fn persist(&mut self) -> Result<usize, EventLogError> {
        let Some(path) = self.output.clone() else {
            return Ok(0);
        };
        self.flushed = true;
        if self.records.is_empty() {
            return Ok(0);
        }
        self.flush(&path)
    }

    /// Load a previously persisted log.
    pub fn load(path: &Path) -> Result<Vec<EventRecord>, std::io::Error> {
        let content = std::fs::read(path)?;
        serde_json::from_slice(&content).map_err(std::io::Error::from)
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if self.flushed || self.records.is_empty() || self.output.is_none() {
            return;
        }
        tracing::warn!(events = self.records.len(), "Event log dropped unflushed, saving");
        if let Err(e) = self.persist() {
            tracing::error!(error = %e, "Failed to save event log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let record = EventRecord::at(now, EventKind::DegradationConfirmed, "svc-1:8000", "value=1 count=2");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["ts"], "2026-03-01T12:00:00+00:00");
        assert_eq!(json["epoch"], 1772366400.0);
        assert_eq!(json["event"], "DEGRADATION_CONFIRMED");
        assert_eq!(json["instance"], "svc-1:8000");
        assert_eq!(json["detail"], "value=1 count=2");
    }

    #[test]
    fn test_insertion_order_and_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, "stale content").unwrap();

        let mut log = EventLog::new();
        log.record(EventKind::DegradationConfirmed, "b:1", "value=2 count=2");
        log.record(EventKind::RemovedFromUpstream, "b:1", "reload=ok");
        log.record(EventKind::HealthyAgain, "a:1", "value=0");
        assert_eq!(log.flush(&path).unwrap(), 3);

        let loaded = EventLog::load(&path).unwrap();
        let kinds: Vec<_> = loaded.iter().map(|r| r.event).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::DegradationConfirmed,
                EventKind::RemovedFromUpstream,
                EventKind::HealthyAgain,
            ]
        );
        assert_eq!(loaded, log.records());
        assert!(loaded[0].epoch <= loaded[2].epoch);
    }

    #[test]
    fn test_persist_empty_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let mut log = EventLog::with_output(&path);
        assert_eq!(log.persist().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_flush_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("events.json");
        let mut log = EventLog::new();
        log.record(EventKind::HealthyAgain, "a:1", "");
        assert!(matches!(log.flush(&path), Err(EventLogError::Write { .. })));
    }

    #[test]
    fn test_failed_persist_is_not_retried_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("later");
        let path = missing.join("events.json");
        {
            let mut log = EventLog::with_output(&path);
            log.record(EventKind::HealthyAgain, "a:1", "value=0");
            assert!(log.persist().is_err());
            // Make the write possible; drop must not attempt it again.
            std::fs::create_dir(&missing).unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_saves_unflushed_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        {
            let mut log = EventLog::with_output(&path);
            log.record(EventKind::RestoredToUpstream, "a:1", "reload=ok");
        }
        let loaded = EventLog::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].event, EventKind::RestoredToUpstream);
    }
}
