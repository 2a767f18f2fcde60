//! An in-memory Panorama.
//!
//! [`FakePanorama`] answers the XML API calls the orchestrator makes and
//! keeps enough state to exercise whole runs: locks, the pending-changes
//! flag, imported files, partial loads, commit jobs and the running
//! configuration returned by exports.
//!
//! Partial loads are recorded but not merged into the candidate. A commit
//! promotes the last loaded file to the running configuration and releases
//! the locks the session holds, as Panorama does for the committing admin.

use crate::fixtures::responses;
use configpump_engine::{
    EngineError, EngineResult, PanoramaTransport, RawResponse, TransportErrorKind,
};
use configpump_protocol::{LockKind, OpCommand, Request};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Lock holder name the fake records for the orchestrator's locks.
pub const SESSION_USER: &str = "configpump";

/// A failure injected for one call type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Answer with `status="error"` and this message.
    ApiError(String),
    /// Answer with this HTTP status and an empty body.
    HttpStatus(u16),
    /// Fail before any response.
    Transport(TransportErrorKind, String),
}

#[derive(Debug, Default)]
struct State {
    running: String,
    pending_changes: bool,
    config_lock: Option<String>,
    commit_lock: Option<String>,
    files: BTreeMap<String, String>,
    loads: Vec<(String, String)>,
    jobs: BTreeMap<String, u32>,
    next_job: u32,
    job_polls: u32,
    failures: HashMap<String, InjectedFailure>,
    commits: Vec<String>,
    requests: Vec<Request>,
}

/// A stateful stand-in for a Panorama management server.
#[derive(Debug, Default)]
pub struct FakePanorama {
    state: Mutex<State>,
}

impl FakePanorama {
    /// Creates a fake whose running configuration is `running`.
    pub fn new(running: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State {
                running: running.into(),
                next_job: 1,
                ..State::default()
            }),
        }
    }

    /// Number of `show jobs` polls a commit job reports as pending.
    pub fn with_job_polls(self, polls: u32) -> Self {
        self.state.lock().job_polls = polls;
        self
    }

    /// Marks the candidate as holding uncommitted changes.
    pub fn with_pending_changes(self) -> Self {
        self.state.lock().pending_changes = true;
        self
    }

    /// Makes another administrator hold a lock.
    pub fn with_foreign_lock(self, kind: LockKind, holder: &str) -> Self {
        {
            let mut state = self.state.lock();
            match kind {
                LockKind::Config => state.config_lock = Some(holder.to_string()),
                LockKind::Commit => state.commit_lock = Some(holder.to_string()),
            }
        }
        self
    }

    /// Fails every call of `call_type` until cleared.
    pub fn fail(&self, call_type: &str, failure: InjectedFailure) {
        self.state
            .lock()
            .failures
            .insert(call_type.to_string(), failure);
    }

    /// Removes every injected failure.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// The running configuration.
    pub fn running_config(&self) -> String {
        self.state.lock().running.clone()
    }

    /// Returns true if uncommitted changes exist.
    pub fn has_pending_changes(&self) -> bool {
        self.state.lock().pending_changes
    }

    /// Holder of a lock, if any.
    pub fn lock_holder(&self, kind: LockKind) -> Option<String> {
        let state = self.state.lock();
        match kind {
            LockKind::Config => state.config_lock.clone(),
            LockKind::Commit => state.commit_lock.clone(),
        }
    }

    /// Content of an imported file.
    pub fn imported_file(&self, name: &str) -> Option<String> {
        self.state.lock().files.get(name).cloned()
    }

    /// Destination selectors of the partial loads since the last commit or
    /// revert.
    pub fn loaded_selectors(&self) -> Vec<String> {
        self.state
            .lock()
            .loads
            .iter()
            .map(|(to_xpath, _)| to_xpath.clone())
            .collect()
    }

    /// Descriptions of accepted commits.
    pub fn commit_descriptions(&self) -> Vec<String> {
        self.state.lock().commits.clone()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Call types of every request received, in order.
    pub fn call_types(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(Request::call_type)
            .collect()
    }

    fn op(state: &mut State, command: &OpCommand) -> String {
        match command {
            OpCommand::CheckPendingChanges => {
                if state.pending_changes {
                    responses::pending()
                } else {
                    responses::no_pending()
                }
            }
            OpCommand::ShowLocks(kind) => match Self::lock_slot(state, *kind) {
                Some(holder) => responses::locks_held(kind.as_str(), holder),
                None => responses::no_locks(kind.as_str()),
            },
            OpCommand::AddLock { kind, .. } => {
                let slot = Self::lock_slot(state, *kind);
                if slot.is_some() {
                    responses::error(&format!("{} is already locked", kind))
                } else {
                    *slot = Some(SESSION_USER.to_string());
                    responses::ok_msg("Successfully acquired lock")
                }
            }
            OpCommand::RemoveLock(kind) => {
                let slot = Self::lock_slot(state, *kind);
                if slot.as_deref() == Some(SESSION_USER) {
                    *slot = None;
                    responses::ok_msg("Successfully released lock")
                } else {
                    responses::error(&format!("{} is not locked by this session", kind))
                }
            }
            OpCommand::ShowJob { job_id } => match state.jobs.get_mut(job_id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    responses::job_pending(job_id, 50)
                }
                Some(_) => responses::job_ok(job_id),
                None => responses::error(&format!("job {} not found", job_id)),
            },
            OpCommand::LoadPartial {
                to_xpath,
                file_name,
                ..
            } => {
                if !state.files.contains_key(file_name) {
                    return responses::error(&format!("{} not found", file_name));
                }
                state.loads.push((to_xpath.clone(), file_name.clone()));
                state.pending_changes = true;
                responses::ok_msg("command succeeded")
            }
            OpCommand::RevertConfig => {
                state.loads.clear();
                state.pending_changes = false;
                responses::ok_msg("Candidate configuration reverted")
            }
        }
    }

    fn lock_slot(state: &mut State, kind: LockKind) -> &mut Option<String> {
        match kind {
            LockKind::Config => &mut state.config_lock,
            LockKind::Commit => &mut state.commit_lock,
        }
    }

    fn commit(state: &mut State, description: &str) -> String {
        if !state.pending_changes {
            return responses::ok_msg("There are no changes to commit.");
        }
        let promoted = state
            .loads
            .last()
            .and_then(|(_, file_name)| state.files.get(file_name))
            .cloned();
        if let Some(file) = promoted {
            state.running = file;
        }
        state.loads.clear();
        state.pending_changes = false;
        for kind in [LockKind::Config, LockKind::Commit] {
            let slot = Self::lock_slot(state, kind);
            if slot.as_deref() == Some(SESSION_USER) {
                *slot = None;
            }
        }
        state.commits.push(description.to_string());

        let job_id = state.next_job.to_string();
        state.next_job += 1;
        state.jobs.insert(job_id.clone(), state.job_polls);
        responses::commit_queued(&job_id)
    }
}

impl PanoramaTransport for FakePanorama {
    fn execute(&self, request: &Request) -> EngineResult<RawResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        match state.failures.get(&request.call_type()) {
            Some(InjectedFailure::ApiError(message)) => {
                return Ok(RawResponse::ok(responses::error(message)));
            }
            Some(InjectedFailure::HttpStatus(status)) => {
                return Ok(RawResponse::new(*status, ""));
            }
            Some(InjectedFailure::Transport(kind, message)) => {
                return Err(EngineError::transport(*kind, message.clone()));
            }
            None => {}
        }

        let body = match request {
            Request::Op(command) => Self::op(&mut state, command),
            Request::Commit { description } => Self::commit(&mut state, description),
            Request::ExportConfiguration => state.running.clone(),
            Request::ImportConfiguration { file_name, content } => {
                state.files.insert(file_name.clone(), content.clone());
                responses::ok_msg(&format!("{} saved", file_name))
            }
        };
        Ok(RawResponse::ok(body))
    }
}
