//! The `<response status="...">` envelope returned by every API call.

use crate::error::{ProtocolError, ProtocolResult};
use crate::value::XmlValue;
use configpump_xml::Document;

/// Placeholder message used when a response carries no text at all.
pub const EMPTY_MESSAGE: &str = "empty message";

/// A parsed API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    response: XmlValue,
}

/// State of an asynchronous job as reported by `show jobs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    /// Job result, e.g. `OK`, `FAIL` or `PEND`.
    pub result: String,
    /// Completion percentage as reported.
    pub progress: String,
}

impl JobState {
    /// Returns true once the job finished successfully.
    pub fn is_ok(&self) -> bool {
        self.result.trim().eq_ignore_ascii_case("ok")
    }
}

impl Envelope {
    /// Parses a response body.
    ///
    /// Documents whose root is not `<response>` parse to an empty envelope.
    pub fn parse(body: &str) -> ProtocolResult<Self> {
        if body.contains("<!DOCTYPE") {
            return Err(ProtocolError::unexpected("DTD is not allowed in API responses"));
        }
        let doc = Document::parse(body).map_err(ProtocolError::InvalidXml)?;
        let response = if doc.root_element().name == "response" {
            XmlValue::from_element(&doc, doc.root())
        } else {
            XmlValue::Null
        };
        Ok(Self { response })
    }

    /// The shaped `<response>` element.
    pub fn response(&self) -> &XmlValue {
        &self.response
    }

    /// Raw `status` attribute.
    pub fn status(&self) -> Option<&str> {
        self.response
            .get("@status")
            .and_then(XmlValue::as_text)
            .filter(|status| !status.is_empty())
    }

    /// Returns true if the status is `success`, ignoring case and padding.
    pub fn is_success(&self) -> bool {
        self.status()
            .is_some_and(|status| status.trim().eq_ignore_ascii_case("success"))
    }

    /// The `<result>` payload.
    pub fn result(&self) -> Option<&XmlValue> {
        self.response.get("result")
    }

    /// Text of the `<msg>` payload, unwrapping one `<line>` level.
    pub fn line_messages(&self) -> String {
        match self.response.get("msg") {
            Some(msg) if msg.is_map() => msg.get("line").map(XmlValue::flatten).unwrap_or_default(),
            Some(msg) => msg.flatten(),
            None => String::new(),
        }
    }

    /// Text of the `<result>` payload.
    pub fn result_messages(&self) -> String {
        self.result().map(XmlValue::flatten).unwrap_or_default()
    }

    /// Line and result messages joined by a space, or [`EMPTY_MESSAGE`].
    pub fn message(&self) -> String {
        let parts: Vec<String> = [self.line_messages(), self.result_messages()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            EMPTY_MESSAGE.to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Job id from a structured result, e.g. after a commit.
    pub fn job_id(&self) -> Option<&str> {
        self.result()
            .filter(|result| result.is_map())
            .and_then(|result| result.get("job"))
            .and_then(XmlValue::as_text)
            .filter(|job| !job.is_empty())
    }

    /// Job state from a `show jobs` result. `None` while the job entry
    /// lacks a textual result or progress.
    pub fn job_state(&self) -> Option<JobState> {
        let job = self.result()?.get("job")?;
        let result = job.get("result")?.as_text()?;
        let progress = job.get("progress")?.as_text()?;
        Some(JobState {
            result: result.to_string(),
            progress: progress.to_string(),
        })
    }
}
