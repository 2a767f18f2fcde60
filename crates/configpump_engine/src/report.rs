//! Job reports persisted after a run.

use crate::error::{EngineError, EngineResult};
use crate::state::{SyncKind, SyncOutcome};
use chrono::{DateTime, Utc};
use configpump_protocol::{LogStatus, Redactor};
use serde::Serialize;
use serde_json::Value;

const LOAD_PARTIAL: &str = "load partial configuration";

/// Marker Panorama leaves in load responses when part of a file was not
/// applied as configuration.
const LOAD_ISSUE_MARKER: &str = "CDATA";

/// Error recorded when a push loaded configuration with issues.
pub const LOAD_ISSUES_ERROR: &str =
    "Configuration was loaded but there were issues. Check the job data for more details.";

/// Summary of one run, safe to persist and display.
///
/// Every string that came from the remote side or from an error has been
/// passed through the [`Redactor`].
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// What was run.
    pub kind: SyncKind,
    /// Whether the run succeeded and the loads reported no issues.
    pub success: bool,
    /// Change identifier of the run.
    pub change_id: String,
    /// Length of the stored remote configuration.
    pub config_pull_length: usize,
    /// When the report was created.
    pub timestamp: DateTime<Utc>,
    /// Run duration in milliseconds.
    pub duration_ms: u64,
    /// Sanitized operation log.
    pub log: Value,
    /// Sanitized load partial entries of a push.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_load_responses: Option<Value>,
    /// True if a load response mentions unapplied content.
    pub config_load_issues: bool,
    /// Sanitized failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    /// Builds the report for an outcome.
    ///
    /// `stored` is the remote configuration the target holds after the run.
    pub fn new(outcome: &SyncOutcome, stored: Option<&str>, redactor: &Redactor) -> Self {
        let pushed = outcome.kind != SyncKind::Pull;
        let load_entries: Vec<_> = outcome
            .log
            .entries()
            .iter()
            .filter(|entry| entry.call_type == LOAD_PARTIAL)
            .collect();
        let config_load_issues = pushed
            && load_entries
                .iter()
                .any(|entry| entry.message.contains(LOAD_ISSUE_MARKER));

        let config_load_responses = pushed.then(|| {
            let mut value = serde_json::to_value(&load_entries).unwrap_or(Value::Null);
            redactor.redact_value(&mut value);
            value
        });

        let error = if !outcome.success {
            let reason = outcome
                .log
                .entries()
                .iter()
                .rev()
                .find(|entry| entry.status == LogStatus::Failure)
                .map(|entry| entry.message.as_str())
                .unwrap_or("no failure was logged");
            Some(format!(
                "Configuration {} failed: {}",
                outcome.kind,
                redactor.redact_str(reason)
            ))
        } else if config_load_issues {
            Some(LOAD_ISSUES_ERROR.to_string())
        } else {
            None
        };

        Self {
            kind: outcome.kind,
            success: outcome.success && !config_load_issues,
            change_id: outcome.change_id().to_string(),
            config_pull_length: stored.map(str::len).unwrap_or(0),
            timestamp: Utc::now(),
            duration_ms: u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
            log: outcome.log.to_sanitized_value(redactor),
            config_load_responses,
            config_load_issues,
            error,
        }
    }

    /// Serializes the report as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::config(format!("failed to serialize job report: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PushPhase;
    use configpump_protocol::OperationLog;
    use std::time::Duration;

    fn outcome(kind: SyncKind, success: bool, log: OperationLog) -> SyncOutcome {
        SyncOutcome {
            kind,
            success,
            log,
            phase: PushPhase::Done,
            cleanup: None,
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn successful_push() {
        let mut log = OperationLog::with_change_id("c1");
        log.success(Some(200), LOAD_PARTIAL, "command succeeded /config/shared");
        log.success(Some(200), "export configuration", "Configuration exported successfully");

        let report = JobReport::new(
            &outcome(SyncKind::Push, true, log),
            Some("<config/>\n"),
            &Redactor::default(),
        );
        assert!(report.success);
        assert_eq!(report.change_id, "c1");
        assert_eq!(report.config_pull_length, 10);
        assert_eq!(report.duration_ms, 1500);
        assert!(!report.config_load_issues);
        assert_eq!(report.error, None);
        assert_eq!(report.config_load_responses.as_ref().unwrap().as_array().unwrap().len(), 1);

        let json: Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["kind"], "push");
        assert_eq!(json["log"][1]["status"], "SUCCESS");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn cdata_in_load_response_flags_issues() {
        let mut log = OperationLog::with_change_id("c2");
        log.success(
            Some(200),
            LOAD_PARTIAL,
            "Config loaded with CDATA section skipped /config/shared",
        );
        let report = JobReport::new(
            &outcome(SyncKind::PushAndPull, true, log),
            None,
            &Redactor::default(),
        );
        assert!(report.config_load_issues);
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some(LOAD_ISSUES_ERROR));
        assert_eq!(report.config_pull_length, 0);
    }

    #[test]
    fn failed_pull_reports_sanitized_reason() {
        let mut log = OperationLog::with_change_id("c3");
        log.failure(
            None,
            "unexpected error",
            "Connection error occurred when connecting to Panorama: https://pano/api/?type=export&key=TOKEN1",
        );
        let report = JobReport::new(
            &outcome(SyncKind::Pull, false, log),
            None,
            &Redactor::new(["TOKEN1"]),
        );
        assert!(!report.success);
        assert_eq!(report.config_load_responses, None);
        let error = report.error.unwrap();
        assert!(error.starts_with("Configuration pull failed: Connection error"));
        assert!(!error.contains("TOKEN1"));
        assert!(!report.log.to_string().contains("TOKEN1"));
    }
}
