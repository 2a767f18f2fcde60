//! Error types for the protocol crate.

use configpump_xml::XmlError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building requests or reading responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The response body is not well-formed XML.
    #[error("Invalid XML: {0}")]
    InvalidXml(XmlError),

    /// The response is well-formed but cannot be interpreted.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// A partial-load selector does not address the configuration tree.
    #[error("XPath entry must start with '/config/': {0}")]
    OutsideConfig(String),

    /// A partial-load selector does not compile.
    #[error("{0}")]
    Selector(XmlError),
}

impl ProtocolError {
    /// Create an unexpected-response error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_prefixes() {
        let err = ProtocolError::InvalidXml(XmlError::NoRootElement);
        assert!(err.to_string().starts_with("Invalid XML: "));

        let err = ProtocolError::unexpected("DTD is not allowed");
        assert_eq!(err.to_string(), "Unexpected error: DTD is not allowed");

        let err = ProtocolError::OutsideConfig("/shared".into());
        assert_eq!(err.to_string(), "XPath entry must start with '/config/': /shared");
    }
}
