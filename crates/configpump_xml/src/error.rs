//! Error types for the XML crate.

use thiserror::Error;

/// Result type for XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Errors that can occur while parsing, querying or rewriting XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("XML parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset in the input where parsing failed.
        position: usize,
        /// Description of the parse error.
        message: String,
    },

    /// The document has no root element.
    #[error("XML document has no root element")]
    NoRootElement,

    /// An XPath selector could not be compiled.
    #[error("invalid XPath '{selector}': {reason}")]
    InvalidXPath {
        /// The offending selector.
        selector: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration document could not be parsed while listing entries.
    #[error("Error parsing XML config: {0}")]
    Config(String),
}

impl XmlError {
    /// Create a parse error.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create an invalid XPath error.
    pub fn invalid_xpath(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidXPath {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_xpath_names_selector() {
        let err = XmlError::invalid_xpath("/config/[", "unexpected end of expression");
        let text = err.to_string();
        assert!(text.contains("/config/["));
        assert!(text.contains("unexpected end"));
    }

    #[test]
    fn parse_error_display() {
        let err = XmlError::parse(12, "unexpected end of file");
        assert_eq!(
            err.to_string(),
            "XML parse error at byte 12: unexpected end of file"
        );
    }
}
