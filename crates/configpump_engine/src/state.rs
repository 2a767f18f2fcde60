//! Push/pull state machine.
//!
//! A push walks a fixed sequence of API calls. Every way out of the
//! sequence leaves the remote side unlocked and refreshes the stored copy
//! of the remote configuration:
//!
//! ```text
//! CheckPending → CheckCommitLocks → CheckConfigLocks        (EarlyAbort)
//!   → AcquireConfigLock → AcquireCommitLock → RecheckPending
//!   → Validate → StageFile                                  (LockedAbort)
//!   → LoadPartial → Commit → PollJob                        (RevertAbort)
//!   → Export → Done
//! ```

use crate::config::{PollConfig, DEFAULT_FILE_NAME_PREFIX};
use crate::error::{EngineError, EngineResult};
use crate::target::{deduce_file_name, SyncTarget};
use crate::transport::{PanoramaTransport, RawResponse};
use configpump_protocol::{
    has_pending_changes, locks_exist, parse_response, Envelope, LockKind, OpCommand,
    OperationLog, ParsedResponse, Request, MISSING_STATUS,
};
use configpump_xml::{extract, normalize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Prefix of lock comments and commit descriptions.
pub const CHANGE_MESSAGE_PREFIX: &str = "ConfigPump change ID:";
/// Call type of entries logged when a run is interrupted by an error.
pub const UNEXPECTED_ERROR: &str = "unexpected error";
/// Call type of entries logged when the cleanup after an error fails too.
pub const CLEANUP_FAILED: &str = "cleanup failed";

const SHOW_JOBS: &str = "show jobs";
const EXPORT_CONFIGURATION: &str = "export configuration";

/// Step of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushPhase {
    /// Nothing sent yet.
    Idle,
    /// Checking for uncommitted candidate changes.
    CheckPending,
    /// Checking for commit locks held by anyone.
    CheckCommitLocks,
    /// Checking for config locks held by anyone.
    CheckConfigLocks,
    /// Taking the config lock.
    AcquireConfigLock,
    /// Taking the commit lock.
    AcquireCommitLock,
    /// Checking for pending changes again while holding both locks.
    RecheckPending,
    /// Checking the rendered configuration.
    Validate,
    /// Uploading the rendered configuration.
    StageFile,
    /// Loading each scoped subtree into the candidate.
    LoadPartial,
    /// Starting the commit job.
    Commit,
    /// Waiting for the commit job.
    PollJob,
    /// Fetching the resulting configuration.
    Export,
    /// Finished.
    Done,
}

impl PushPhase {
    /// The cleanup an error in this phase requires.
    pub fn cleanup(&self) -> Cleanup {
        match self {
            PushPhase::Idle
            | PushPhase::CheckPending
            | PushPhase::CheckCommitLocks
            | PushPhase::CheckConfigLocks => Cleanup::EarlyAbort,
            PushPhase::AcquireConfigLock
            | PushPhase::AcquireCommitLock
            | PushPhase::RecheckPending
            | PushPhase::Validate
            | PushPhase::StageFile => Cleanup::LockedAbort,
            PushPhase::LoadPartial
            | PushPhase::Commit
            | PushPhase::PollJob
            | PushPhase::Export
            | PushPhase::Done => Cleanup::RevertAbort,
        }
    }

    /// Returns true once a lock may be held.
    pub fn holds_locks(&self) -> bool {
        self.cleanup() != Cleanup::EarlyAbort
    }
}

/// Recovery sequence run when a push stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cleanup {
    /// Export only; no lock was taken.
    EarlyAbort,
    /// Remove the commit lock, remove the config lock, export.
    LockedAbort,
    /// Revert the candidate, then [`Cleanup::LockedAbort`].
    RevertAbort,
}

impl Cleanup {
    fn describe(&self) -> &'static str {
        match self {
            Cleanup::EarlyAbort => "export the latest configuration",
            Cleanup::LockedAbort => "remove locks and export the latest configuration",
            Cleanup::RevertAbort => {
                "revert to the latest configuration, remove locks and export the latest configuration"
            }
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncKind {
    /// Push followed by the final export.
    Push,
    /// Export only.
    Pull,
    /// Push, then a separate pull on success.
    PushAndPull,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncKind::Push => "push",
            SyncKind::Pull => "pull",
            SyncKind::PushAndPull => "push-and-pull",
        })
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// What was run.
    pub kind: SyncKind,
    /// Whether the run reached its goal.
    pub success: bool,
    /// Every step taken, under one change identifier.
    pub log: OperationLog,
    /// Last phase entered.
    pub phase: PushPhase,
    /// Cleanup run after the push stopped early, if any.
    pub cleanup: Option<Cleanup>,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl SyncOutcome {
    /// The change identifier of the run.
    pub fn change_id(&self) -> &str {
        self.log.change_id()
    }
}

/// Per-run state, kept off the orchestrator so runs can overlap.
struct Run<'t, S: SyncTarget + ?Sized> {
    target: &'t S,
    log: OperationLog,
    phase: PushPhase,
    cleanup: Option<Cleanup>,
    file_name: String,
}

impl<'t, S: SyncTarget + ?Sized> Run<'t, S> {
    fn enter(&mut self, phase: PushPhase) {
        tracing::debug!(change_id = %self.log.change_id(), ?phase, "entering phase");
        self.phase = phase;
    }

    fn change_message(&self) -> String {
        format!("{} {}", CHANGE_MESSAGE_PREFIX, self.log.change_id())
    }
}

/// Drives push and pull runs against one Panorama endpoint.
///
/// The orchestrator holds no per-run state; distinct targets may be synced
/// from several threads at once. Runs against the same endpoint must be
/// serialized by the caller since they contend for the same locks.
pub struct Orchestrator<T: PanoramaTransport> {
    transport: T,
    poll: PollConfig,
    file_name_prefix: String,
}

impl<T: PanoramaTransport> Orchestrator<T> {
    /// Creates an orchestrator with default polling and file name prefix.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll: PollConfig::default(),
            file_name_prefix: DEFAULT_FILE_NAME_PREFIX.to_string(),
        }
    }

    /// Sets the commit polling behavior.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the import file name prefix.
    pub fn with_file_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_name_prefix = prefix.into();
        self
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Pushes the rendered configuration of `target`.
    ///
    /// Never fails: every error is logged, followed by the cleanup matching
    /// the progress made, and reported as an unsuccessful outcome.
    pub fn push<S: SyncTarget + ?Sized>(&self, target: &S) -> SyncOutcome {
        self.run_push(target, OperationLog::new())
    }

    /// Exports the remote configuration and stores the scoped part of it.
    pub fn pull<S: SyncTarget + ?Sized>(&self, target: &S) -> SyncOutcome {
        self.run_pull(target, OperationLog::new())
    }

    /// Pushes, then pulls if the push succeeded. Both share one log.
    pub fn push_and_pull<S: SyncTarget + ?Sized>(&self, target: &S) -> SyncOutcome {
        let pushed = self.run_push(target, OperationLog::new());
        if !pushed.success {
            return SyncOutcome {
                kind: SyncKind::PushAndPull,
                ..pushed
            };
        }

        let pulled = self.run_pull(target, pushed.log);
        SyncOutcome {
            kind: SyncKind::PushAndPull,
            duration: pushed.duration + pulled.duration,
            ..pulled
        }
    }

    fn new_run<'t, S: SyncTarget + ?Sized>(&self, target: &'t S, log: OperationLog) -> Run<'t, S> {
        Run {
            target,
            log,
            phase: PushPhase::Idle,
            cleanup: None,
            file_name: deduce_file_name(&self.file_name_prefix, target.device_name()),
        }
    }

    fn run_push<S: SyncTarget + ?Sized>(&self, target: &S, log: OperationLog) -> SyncOutcome {
        let start = Instant::now();
        let mut run = self.new_run(target, log);
        tracing::info!(
            change_id = %run.log.change_id(),
            device = %target.device_name(),
            "push started"
        );

        let success = match self.push_steps(&mut run) {
            Ok(success) => success,
            Err(err) => {
                self.recover(&mut run, &err);
                false
            }
        };

        tracing::info!(
            change_id = %run.log.change_id(),
            success,
            phase = ?run.phase,
            "push finished"
        );
        SyncOutcome {
            kind: SyncKind::Push,
            success,
            log: run.log,
            phase: run.phase,
            cleanup: run.cleanup,
            duration: start.elapsed(),
        }
    }

    fn run_pull<S: SyncTarget + ?Sized>(&self, target: &S, log: OperationLog) -> SyncOutcome {
        let start = Instant::now();
        let mut run = self.new_run(target, log);
        tracing::info!(
            change_id = %run.log.change_id(),
            device = %target.device_name(),
            "pull started"
        );

        run.enter(PushPhase::Export);
        let success = match self.export(&mut run) {
            Ok(success) => success,
            Err(err) => {
                tracing::warn!(change_id = %run.log.change_id(), error = %err, "pull failed");
                run.log.failure(None, UNEXPECTED_ERROR, err.to_string());
                false
            }
        };
        run.enter(PushPhase::Done);

        tracing::info!(change_id = %run.log.change_id(), success, "pull finished");
        SyncOutcome {
            kind: SyncKind::Pull,
            success,
            log: run.log,
            phase: run.phase,
            cleanup: None,
            duration: start.elapsed(),
        }
    }

    fn push_steps<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>) -> EngineResult<bool> {
        run.enter(PushPhase::CheckPending);
        if self.check_pending(run)? {
            return self.abort(run, Cleanup::EarlyAbort);
        }

        run.enter(PushPhase::CheckCommitLocks);
        if self.locks_exist(run, LockKind::Commit) {
            return self.abort(run, Cleanup::EarlyAbort);
        }

        run.enter(PushPhase::CheckConfigLocks);
        if self.locks_exist(run, LockKind::Config) {
            return self.abort(run, Cleanup::EarlyAbort);
        }

        // Config lock first, then commit lock.
        for (phase, kind) in [
            (PushPhase::AcquireConfigLock, LockKind::Config),
            (PushPhase::AcquireCommitLock, LockKind::Commit),
        ] {
            run.enter(phase);
            let add = OpCommand::AddLock {
                kind,
                comment: run.change_message(),
            };
            if !self.call(run, add.into(), None)?.status {
                return self.abort(run, Cleanup::LockedAbort);
            }
        }

        run.enter(PushPhase::RecheckPending);
        if self.check_pending(run)? {
            return self.abort(run, Cleanup::LockedAbort);
        }

        run.enter(PushPhase::Validate);
        let normalized = validate(&run.target.rendered_configuration()?)?;

        run.enter(PushPhase::StageFile);
        let import = Request::ImportConfiguration {
            file_name: run.file_name.clone(),
            content: normalized,
        };
        if !self.call(run, import, None)?.status {
            return self.abort(run, Cleanup::LockedAbort);
        }

        run.enter(PushPhase::LoadPartial);
        if !self.load_partial(run)? {
            return self.abort(run, Cleanup::RevertAbort);
        }

        run.enter(PushPhase::Commit);
        let commit = Request::Commit {
            description: run.change_message(),
        };
        let parsed = self.call(run, commit, None)?;
        let job_id = match parsed.commit_job_id {
            Some(job_id) if parsed.status => job_id,
            _ => return self.abort(run, Cleanup::RevertAbort),
        };

        run.enter(PushPhase::PollJob);
        if !self.poll_job(run, &job_id) {
            return self.abort(run, Cleanup::RevertAbort);
        }

        run.enter(PushPhase::Export);
        let exported = self.export(run)?;
        run.enter(PushPhase::Done);
        Ok(exported)
    }

    /// Logs an error that interrupted the push and runs the cleanup for
    /// the phase it happened in.
    fn recover<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>, err: &EngineError) {
        let cleanup = run.phase.cleanup();
        tracing::warn!(
            change_id = %run.log.change_id(),
            phase = ?run.phase,
            ?cleanup,
            error = %err,
            "push interrupted"
        );
        run.log.failure(None, UNEXPECTED_ERROR, err.to_string());

        run.cleanup = Some(cleanup);
        if let Err(cleanup_err) = self.cleanup(run, cleanup) {
            tracing::error!(
                change_id = %run.log.change_id(),
                ?cleanup,
                error = %cleanup_err,
                "cleanup failed"
            );
            run.log.failure(
                None,
                CLEANUP_FAILED,
                format!("Tried to {} but failed: {}", cleanup.describe(), cleanup_err),
            );
        }
    }

    fn abort<S: SyncTarget + ?Sized>(
        &self,
        run: &mut Run<'_, S>,
        cleanup: Cleanup,
    ) -> EngineResult<bool> {
        tracing::warn!(
            change_id = %run.log.change_id(),
            phase = ?run.phase,
            ?cleanup,
            "push aborted"
        );
        run.cleanup = Some(cleanup);
        self.cleanup(run, cleanup)?;
        Ok(false)
    }

    fn cleanup<S: SyncTarget + ?Sized>(
        &self,
        run: &mut Run<'_, S>,
        cleanup: Cleanup,
    ) -> EngineResult<bool> {
        match cleanup {
            Cleanup::EarlyAbort => self.export(run),
            Cleanup::LockedAbort => self.remove_locks_and_export(run),
            Cleanup::RevertAbort => {
                let reverted = self.call(run, OpCommand::RevertConfig.into(), None)?.status;
                let released = self.remove_locks_and_export(run)?;
                Ok(reverted && released)
            }
        }
    }

    fn remove_locks_and_export<S: SyncTarget + ?Sized>(
        &self,
        run: &mut Run<'_, S>,
    ) -> EngineResult<bool> {
        let commit_released = self
            .call(run, OpCommand::RemoveLock(LockKind::Commit).into(), None)?
            .status;
        let config_released = self
            .call(run, OpCommand::RemoveLock(LockKind::Config).into(), None)?
            .status;
        let exported = self.export(run)?;
        Ok(commit_released && config_released && exported)
    }

    fn send<S: SyncTarget + ?Sized>(
        &self,
        run: &Run<'_, S>,
        request: &Request,
    ) -> EngineResult<RawResponse> {
        tracing::debug!(
            change_id = %run.log.change_id(),
            call_type = %request.call_type(),
            "calling API"
        );
        self.transport.execute(request)
    }

    fn call<S: SyncTarget + ?Sized>(
        &self,
        run: &mut Run<'_, S>,
        request: Request,
        extra: Option<&str>,
    ) -> EngineResult<ParsedResponse> {
        let response = self.send(run, &request)?;
        Ok(parse_response(
            &mut run.log,
            &request.call_type(),
            response.status,
            &response.body,
            extra,
        ))
    }

    fn check_pending<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>) -> EngineResult<bool> {
        let response = self.send(run, &OpCommand::CheckPendingChanges.into())?;
        Ok(has_pending_changes(
            &mut run.log,
            response.status,
            &response.body,
        ))
    }

    /// Transport failures count as "locks exist".
    fn locks_exist<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>, kind: LockKind) -> bool {
        let request: Request = OpCommand::ShowLocks(kind).into();
        match self.send(run, &request) {
            Ok(response) => locks_exist(&mut run.log, kind, response.status, &response.body),
            Err(err) => {
                run.log
                    .failure(None, request.call_type(), format!("Unexpected error: {}", err));
                true
            }
        }
    }

    fn load_partial<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>) -> EngineResult<bool> {
        for to_xpath in run.target.xpath_entries()? {
            let command = OpCommand::load_partial(&to_xpath, &run.file_name)?;
            if !self.call(run, command.into(), Some(&to_xpath))?.status {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sleeps, then polls, up to the configured number of attempts.
    ///
    /// Transport failures and unreadable responses end polling unsuccessfully.
    fn poll_job<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>, job_id: &str) -> bool {
        let request: Request = OpCommand::ShowJob {
            job_id: job_id.to_string(),
        }
        .into();
        let mut last_status = None;

        for attempt in 1..=self.poll.attempts {
            std::thread::sleep(self.poll.interval);

            let response = match self.send(run, &request) {
                Ok(response) => response,
                Err(err) => {
                    run.log
                        .failure(None, SHOW_JOBS, format!("Unexpected error: {}", err));
                    return false;
                }
            };
            last_status = Some(response.status);

            let envelope = match Envelope::parse(&response.body) {
                Ok(envelope) => envelope,
                Err(err) => {
                    run.log.failure(None, SHOW_JOBS, err.to_string());
                    return false;
                }
            };

            if !envelope.is_success() {
                run.log.failure(
                    last_status,
                    SHOW_JOBS,
                    format!(
                        "Commit job '{}' returned unknown status {}",
                        job_id,
                        envelope.status().unwrap_or(MISSING_STATUS)
                    ),
                );
                break;
            }

            let Some(state) = envelope.job_state() else {
                tracing::debug!(job_id, attempt, "job state not reported yet");
                continue;
            };

            if !state.is_ok() {
                run.log.pending(
                    last_status,
                    SHOW_JOBS,
                    format!("Commit job progress: {}%", state.progress),
                );
                continue;
            }

            run.log.success(
                last_status,
                SHOW_JOBS,
                format!("Commit job '{}' completed successfully", job_id),
            );
            return true;
        }

        run.log
            .failure(last_status, SHOW_JOBS, "Job did not complete on time");
        false
    }

    fn export<S: SyncTarget + ?Sized>(&self, run: &mut Run<'_, S>) -> EngineResult<bool> {
        let response = self.send(run, &Request::ExportConfiguration)?;
        if response.status != 200 {
            run.log.failure(
                Some(response.status),
                EXPORT_CONFIGURATION,
                "HTTP status code is not 200",
            );
            return Ok(false);
        }

        let entries = run.target.xpath_entries()?;
        let extracted = extract(&response.body, &entries)?;
        run.target.store_configuration(&extracted)?;

        run.log.success(
            Some(response.status),
            EXPORT_CONFIGURATION,
            "Configuration exported successfully",
        );
        Ok(true)
    }
}

/// Returns the normalized configuration, or why it cannot be pushed.
fn validate(rendered: &str) -> EngineResult<String> {
    if rendered.is_empty() {
        return Err(EngineError::validation("Rendered configuration is empty."));
    }
    let (normalized, valid) = normalize(rendered);
    if !valid {
        return Err(EngineError::validation("Configuration is invalid."));
    }
    Ok(normalized)
}
