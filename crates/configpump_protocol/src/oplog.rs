//! Per-run operation log.

use crate::sanitize::Redactor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one logged step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStatus {
    /// The step succeeded.
    Success,
    /// The step failed.
    Failure,
    /// The step is still in progress.
    Pending,
}

/// One logged step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Outcome.
    pub status: LogStatus,
    /// HTTP status of the call, when a response was received.
    pub http_status_code: Option<u16>,
    /// What was attempted, e.g. `add config lock`.
    pub call_type: String,
    /// Human-readable result.
    #[serde(rename = "response")]
    pub message: String,
    /// Change identifier of the run.
    pub change_id: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// An append-only log sharing one change identifier.
///
/// # Invariants
///
/// - Every entry carries the log's change identifier
/// - Entries stay in append order
#[derive(Debug, Clone)]
pub struct OperationLog {
    change_id: String,
    entries: Vec<LogEntry>,
}

impl OperationLog {
    /// Creates an empty log with a fresh random change identifier.
    pub fn new() -> Self {
        Self::with_change_id(Uuid::new_v4().to_string())
    }

    /// Creates an empty log with a given change identifier.
    pub fn with_change_id(change_id: impl Into<String>) -> Self {
        Self {
            change_id: change_id.into(),
            entries: Vec::new(),
        }
    }

    /// The change identifier.
    pub fn change_id(&self) -> &str {
        &self.change_id
    }

    /// Appends an entry.
    pub fn log(
        &mut self,
        status: LogStatus,
        http_status_code: Option<u16>,
        call_type: impl Into<String>,
        message: impl Into<String>,
    ) {
        let entry = LogEntry {
            status,
            http_status_code,
            call_type: call_type.into(),
            message: message.into(),
            change_id: self.change_id.clone(),
            timestamp: Utc::now(),
        };
        match status {
            LogStatus::Failure => tracing::warn!(
                change_id = %self.change_id,
                call_type = %entry.call_type,
                http_status = ?entry.http_status_code,
                "step failed"
            ),
            _ => tracing::debug!(
                change_id = %self.change_id,
                call_type = %entry.call_type,
                status = ?status,
                "step logged"
            ),
        }
        self.entries.push(entry);
    }

    /// Appends a success entry.
    pub fn success(&mut self, http: Option<u16>, call_type: impl Into<String>, message: impl Into<String>) {
        self.log(LogStatus::Success, http, call_type, message);
    }

    /// Appends a failure entry.
    pub fn failure(&mut self, http: Option<u16>, call_type: impl Into<String>, message: impl Into<String>) {
        self.log(LogStatus::Failure, http, call_type, message);
    }

    /// Appends a pending entry.
    pub fn pending(&mut self, http: Option<u16>, call_type: impl Into<String>, message: impl Into<String>) {
        self.log(LogStatus::Pending, http, call_type, message);
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the entries with every string redacted.
    pub fn to_sanitized_value(&self, redactor: &Redactor) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.entries).unwrap_or(serde_json::Value::Null);
        redactor.redact_value(&mut value);
        value
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_share_change_id_and_order() {
        let mut log = OperationLog::new();
        log.success(Some(200), "check pending changes", "no pending changes found");
        log.failure(None, "show commit locks", "Locks exist");
        log.pending(Some(200), "show jobs", "Commit job progress: 50%");

        assert_eq!(log.len(), 3);
        assert!(log.entries().iter().all(|e| e.change_id == log.change_id()));
        assert_eq!(log.entries()[1].call_type, "show commit locks");
        assert_eq!(log.last().unwrap().status, LogStatus::Pending);
        assert!(log.entries()[0].timestamp <= log.entries()[2].timestamp);
    }

    #[test]
    fn change_ids_are_unique() {
        assert_ne!(OperationLog::new().change_id(), OperationLog::new().change_id());
    }

    #[test]
    fn sanitized_shape() {
        let mut log = OperationLog::with_change_id("run-1");
        log.failure(
            None,
            "unexpected error",
            "Connection error occurred when connecting to Panorama: https://fw/api/?key=SECRET",
        );
        let value = log.to_sanitized_value(&Redactor::new(["SECRET"]));
        let entry = &value[0];
        assert_eq!(entry["status"], "FAILURE");
        assert_eq!(entry["http_status_code"], serde_json::Value::Null);
        assert_eq!(entry["call_type"], "unexpected error");
        assert_eq!(
            entry["response"],
            "Connection error occurred when connecting to Panorama: https://fw/api/?key=***"
        );
        assert_eq!(entry["change_id"], "run-1");
        assert!(entry["timestamp"].as_str().unwrap().contains('T'));
    }
}
