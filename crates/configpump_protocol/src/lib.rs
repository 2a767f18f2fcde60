//! # ConfigPump Protocol
//!
//! Vocabulary of the Panorama XML API.
//!
//! This crate provides:
//! - `Request` and `OpCommand` builders for every call the sync engine makes
//! - `Envelope`, a dictionary-shaped view of `<response>` bodies
//! - Response checks that record their verdict in an `OperationLog`
//! - `Redactor` for scrubbing secrets before a log is persisted
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
mod oplog;
mod parser;
mod request;
mod sanitize;
mod value;

pub use envelope::{Envelope, JobState, EMPTY_MESSAGE};
pub use error::{ProtocolError, ProtocolResult};
pub use oplog::{LogEntry, LogStatus, OperationLog};
pub use parser::{has_pending_changes, locks_exist, parse_response, ParsedResponse, MISSING_STATUS};
pub use request::{LockKind, OpCommand, Request, CONFIG_ROOT};
pub use sanitize::{Redactor, REDACTED};
pub use value::{XmlValue, TEXT_KEY};
