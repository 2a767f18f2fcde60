//! # ConfigPump Engine
//!
//! Push/pull orchestration against a Panorama configuration API.
//!
//! This crate provides:
//! - Connection, polling and plugin settings
//! - Transport abstraction with an HTTP (`reqwest`) implementation and a mock
//! - The push state machine (locks → stage → load → commit → poll → export)
//!   with progress-matched cleanup
//! - Pull (export and store the scoped configuration)
//! - Drift evaluation and job reports
//!
//! ## Architecture
//!
//! A push takes exclusive locks, uploads the rendered configuration, loads
//! each scoped subtree into the candidate, commits, waits for the commit
//! job and finally exports the result. A failure at any step runs the
//! cleanup for the progress made so far:
//!
//! - before any lock: export only
//! - locks requested: release both locks, export
//! - candidate touched: revert, release both locks, export
//!
//! ## Key Invariants
//!
//! - Runs never return an error; the outcome carries a flag and a log
//! - Every log entry of a run shares one change identifier
//! - Config lock is taken before commit lock
//! - Partial loads only target `/config/...` selectors

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod report;
mod state;
mod status;
mod target;
mod transport;

pub use config::{
    ConnectionConfig, ConnectionTemplate, PluginSettings, PollConfig, DEFAULT_FILE_NAME_PREFIX,
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{EngineError, EngineResult, TransportErrorKind};
pub use http::{HttpClient, HttpTransport, ReqwestClient, UPLOAD_CONTENT_TYPE, UPLOAD_FIELD};
pub use report::{JobReport, LOAD_ISSUES_ERROR};
pub use state::{
    Cleanup, Orchestrator, PushPhase, SyncKind, SyncOutcome, CHANGE_MESSAGE_PREFIX,
    CLEANUP_FAILED, UNEXPECTED_ERROR,
};
pub use status::{DiffView, SyncStatus};
pub use target::{deduce_file_name, MemorySyncTarget, SyncTarget, XPathScope};
pub use transport::{MockTransport, PanoramaTransport, RawResponse};
