//! Response checks that record their verdict in an [`OperationLog`].
//!
//! Each function appends exactly one entry and never fails; unknown or
//! malformed responses are treated as the unsafe outcome.

use crate::envelope::Envelope;
use crate::error::ProtocolError;
use crate::oplog::OperationLog;
use crate::request::LockKind;

/// Outcome of a generic API call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// True if the API reported success.
    pub status: bool,
    /// Job id of an asynchronous commit.
    pub commit_job_id: Option<String>,
}

/// Status text used in messages when the attribute is missing.
pub const MISSING_STATUS: &str = "<missing>";

fn log_parse_error(log: &mut OperationLog, call_type: &str, err: &ProtocolError) {
    log.failure(None, call_type, err.to_string());
}

/// Interprets a generic `<response>` and logs its messages.
///
/// `extra` is appended to the logged message, e.g. the selector a partial
/// load targeted.
pub fn parse_response(
    log: &mut OperationLog,
    call_type: &str,
    http_status: u16,
    body: &str,
    extra: Option<&str>,
) -> ParsedResponse {
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            log_parse_error(log, call_type, &err);
            return ParsedResponse::default();
        }
    };

    let mut message = envelope.message();
    if let Some(extra) = extra.filter(|extra| !extra.is_empty()) {
        message.push(' ');
        message.push_str(extra);
    }
    let commit_job_id = envelope.job_id().map(str::to_string);

    if envelope.status().is_none() {
        log.failure(Some(http_status), call_type, "invalid status format");
        return ParsedResponse {
            status: false,
            commit_job_id,
        };
    }

    if envelope.is_success() {
        log.success(Some(http_status), call_type, message);
        ParsedResponse {
            status: true,
            commit_job_id,
        }
    } else {
        log.failure(Some(http_status), call_type, message);
        ParsedResponse {
            status: false,
            commit_job_id,
        }
    }
}

/// Returns true unless the device positively reports no pending changes.
pub fn has_pending_changes(log: &mut OperationLog, http_status: u16, body: &str) -> bool {
    let call_type = "check pending changes";
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            log_parse_error(log, call_type, &err);
            return true;
        }
    };

    if envelope.status().is_none() {
        log.failure(Some(http_status), call_type, "invalid status format");
        return true;
    }

    let Some(result) = envelope.result().and_then(|r| r.as_text()).filter(|r| !r.is_empty()) else {
        log.failure(Some(http_status), call_type, "invalid result format");
        return true;
    };

    if result.trim().eq_ignore_ascii_case("yes") {
        log.failure(Some(http_status), call_type, "pending changes found");
        return true;
    }

    log.success(Some(http_status), call_type, "no pending changes found");
    false
}

/// Returns true unless the device positively reports no locks of `kind`.
pub fn locks_exist(log: &mut OperationLog, kind: LockKind, http_status: u16, body: &str) -> bool {
    let call_type = format!("show {} locks", kind);
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            log_parse_error(log, &call_type, &err);
            return true;
        }
    };

    if !envelope.is_success() {
        log.failure(
            Some(http_status),
            &call_type,
            format!(
                "Show {} locks returned unknown status {}",
                kind,
                envelope.status().unwrap_or(MISSING_STATUS)
            ),
        );
        return true;
    }

    let Some(result) = envelope.result().filter(|r| r.is_map()) else {
        log.failure(Some(http_status), &call_type, "Unknown result format");
        return true;
    };

    let locks_key = format!("{}-locks", kind);
    if result.get(&locks_key).is_some_and(|locks| locks.is_truthy()) {
        log.failure(Some(http_status), &call_type, "Locks exist");
        return true;
    }

    log.success(Some(http_status), &call_type, "No locks exist");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oplog::LogStatus;

    fn last(log: &OperationLog) -> (LogStatus, Option<u16>, String, String) {
        let entry = log.last().unwrap();
        (
            entry.status,
            entry.http_status_code,
            entry.call_type.clone(),
            entry.message.clone(),
        )
    }

    #[test]
    fn success_with_extra() {
        let mut log = OperationLog::new();
        let parsed = parse_response(
            &mut log,
            "load partial configuration",
            200,
            "<response status=\"success\"><msg>command succeeded</msg></response>",
            Some("/config/shared"),
        );
        assert!(parsed.status);
        assert_eq!(
            last(&log),
            (
                LogStatus::Success,
                Some(200),
                "load partial configuration".to_string(),
                "command succeeded /config/shared".to_string()
            )
        );
    }

    #[test]
    fn empty_result_yields_placeholder() {
        let mut log = OperationLog::new();
        let parsed = parse_response(&mut log, "add config lock", 200, "<response status=\"success\"><result/></response>", None);
        assert!(parsed.status);
        assert_eq!(log.last().unwrap().message, "empty message");
    }

    #[test]
    fn failure_status_keeps_message() {
        let mut log = OperationLog::new();
        let parsed = parse_response(
            &mut log,
            "add config lock",
            200,
            "<response status=\"error\"><msg><line>Config for scope shared is currently locked by admin</line></msg></response>",
            None,
        );
        assert!(!parsed.status);
        let (status, _, _, message) = last(&log);
        assert_eq!(status, LogStatus::Failure);
        assert_eq!(message, "Config for scope shared is currently locked by admin");
    }

    #[test]
    fn missing_status_and_malformed_body() {
        let mut log = OperationLog::new();
        assert!(!parse_response(&mut log, "commit", 200, "<response><result/></response>", None).status);
        assert_eq!(log.last().unwrap().message, "invalid status format");

        assert!(!parse_response(&mut log, "commit", 200, "<response", None).status);
        let (status, http, _, message) = last(&log);
        assert_eq!(status, LogStatus::Failure);
        assert_eq!(http, None);
        assert!(message.starts_with("Invalid XML: "));

        assert!(!parse_response(&mut log, "commit", 200, "<!DOCTYPE r><response status=\"success\"/>", None).status);
        assert!(log.last().unwrap().message.starts_with("Unexpected error: "));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn commit_job_id_surfaces() {
        let mut log = OperationLog::new();
        let parsed = parse_response(
            &mut log,
            "commit",
            200,
            "<response status=\"success\" code=\"19\"><result><msg><line>Commit job enqueued with jobid 3</line></msg><job>3</job></result></response>",
            None,
        );
        assert_eq!(parsed.commit_job_id.as_deref(), Some("3"));
    }

    #[test]
    fn pending_changes_check() {
        let mut log = OperationLog::new();
        assert!(has_pending_changes(&mut log, 200, "<response status=\"success\"><result> YES </result></response>"));
        assert_eq!(log.last().unwrap().message, "pending changes found");

        assert!(!has_pending_changes(&mut log, 200, "<response status=\"success\"><result>no</result></response>"));
        assert_eq!(last(&log).0, LogStatus::Success);
        assert_eq!(log.last().unwrap().message, "no pending changes found");

        assert!(has_pending_changes(&mut log, 200, "<response status=\"success\"><result><x/></result></response>"));
        assert_eq!(log.last().unwrap().message, "invalid result format");

        assert!(has_pending_changes(&mut log, 200, "<response><result>no</result></response>"));
        assert_eq!(log.last().unwrap().message, "invalid status format");

        assert!(has_pending_changes(&mut log, 200, "garbage"));
        assert!(log.last().unwrap().message.starts_with("Invalid XML"));
    }

    #[test]
    fn lock_checks() {
        let mut log = OperationLog::new();
        let none = "<response status=\"success\"><result><config-locks/></result></response>";
        assert!(!locks_exist(&mut log, LockKind::Config, 200, none));
        assert_eq!(last(&log).2, "show config locks");
        assert_eq!(last(&log).3, "No locks exist");

        let held = "<response status=\"success\"><result><commit-locks><entry name=\"admin\"><comment>x</comment></entry></commit-locks></result></response>";
        assert!(locks_exist(&mut log, LockKind::Commit, 200, held));
        assert_eq!(last(&log).3, "Locks exist");

        let odd = "<response status=\"success\"><result>text</result></response>";
        assert!(locks_exist(&mut log, LockKind::Commit, 200, odd));
        assert_eq!(last(&log).3, "Unknown result format");

        let error = "<response status=\"error\"/>";
        assert!(locks_exist(&mut log, LockKind::Config, 200, error));
        assert_eq!(last(&log).3, "Show config locks returned unknown status error");

        assert!(locks_exist(&mut log, LockKind::Config, 200, "<response"));
        assert!(last(&log).3.starts_with("Invalid XML"));
    }
}
