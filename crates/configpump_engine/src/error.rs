//! Error types for the sync engine.

use configpump_protocol::ProtocolError;
use configpump_xml::XmlError;
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Category of a failed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// TLS handshake or certificate verification failed.
    Ssl,
    /// The connection could not be established.
    Connection,
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The server answered with a 4xx or 5xx status.
    Http,
    /// The request could not be built or sent.
    Request,
    /// Anything else.
    Unexpected,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Ssl => "SSL error",
            TransportErrorKind::Connection => "Connection error",
            TransportErrorKind::Timeout => "Request timeout",
            TransportErrorKind::Http => "HTTP error",
            TransportErrorKind::Request => "Request error",
            TransportErrorKind::Unexpected => "Unexpected error",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during a sync run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The remote API could not be reached or rejected the exchange.
    #[error("{kind} occurred when connecting to Panorama: {message}")]
    Transport {
        /// Failure category.
        kind: TransportErrorKind,
        /// Underlying error text.
        message: String,
    },

    /// Settings could not be loaded or resolved.
    #[error("{0}")]
    Config(String),

    /// The input to a run is unusable, e.g. an empty rendered configuration.
    #[error("{0}")]
    Validation(String),

    /// XML processing failed.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// A request could not be built.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The sync target failed to store a configuration.
    #[error("failed to store configuration: {0}")]
    Persist(String),
}

impl EngineError {
    /// Creates a transport error.
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if the error came from the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, EngineError::Transport { .. })
    }
}
