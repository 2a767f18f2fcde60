//! Transport layer abstraction for the Panorama XML API.

use crate::error::{EngineError, EngineResult, TransportErrorKind};
use configpump_protocol::Request;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// An HTTP status and body as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a `200 OK` response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Sends API requests to a Panorama endpoint.
///
/// This trait abstracts the network layer so the orchestrator can run
/// against a real HTTP client, a scripted mock, or an in-memory fake.
pub trait PanoramaTransport: Send + Sync {
    /// Executes one request and returns the raw response.
    ///
    /// Implementations fail with [`EngineError::Transport`] when no usable
    /// response was received, including HTTP error statuses.
    fn execute(&self, request: &Request) -> EngineResult<RawResponse>;
}

impl<T: PanoramaTransport + ?Sized> PanoramaTransport for &T {
    fn execute(&self, request: &Request) -> EngineResult<RawResponse> {
        (**self).execute(request)
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Response(RawResponse),
    Error(TransportErrorKind, String),
}

/// A mock transport for testing.
///
/// Replies are keyed by call type (see [`Request::call_type`]). Queued
/// replies are consumed first, then the sticky reply set for that call
/// type is returned. Unscripted calls fail with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<MockReply>>>,
    sticky: Mutex<HashMap<String, RawResponse>>,
    calls: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Creates a mock with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reply returned for every call of `call_type`.
    pub fn set_response(&self, call_type: &str, response: RawResponse) {
        self.sticky.lock().insert(call_type.to_string(), response);
    }

    /// Queues a reply for the next call of `call_type`.
    pub fn push_response(&self, call_type: &str, response: RawResponse) {
        self.queue(call_type, MockReply::Response(response));
    }

    /// Queues a transport failure for the next call of `call_type`.
    pub fn push_error(&self, call_type: &str, kind: TransportErrorKind, message: &str) {
        self.queue(call_type, MockReply::Error(kind, message.to_string()));
    }

    fn queue(&self, call_type: &str, reply: MockReply) {
        self.queued
            .lock()
            .entry(call_type.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().clone()
    }

    /// Call types of every request received, in order.
    pub fn call_types(&self) -> Vec<String> {
        self.calls.lock().iter().map(Request::call_type).collect()
    }
}

impl PanoramaTransport for MockTransport {
    fn execute(&self, request: &Request) -> EngineResult<RawResponse> {
        self.calls.lock().push(request.clone());
        let call_type = request.call_type();

        let queued = self
            .queued
            .lock()
            .get_mut(&call_type)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(MockReply::Response(response)) => return Ok(response),
            Some(MockReply::Error(kind, message)) => {
                return Err(EngineError::transport(kind, message))
            }
            None => {}
        }

        self.sticky.lock().get(&call_type).cloned().ok_or_else(|| {
            EngineError::transport(
                TransportErrorKind::Unexpected,
                format!("no mock response for '{}'", call_type),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configpump_protocol::{LockKind, OpCommand};

    #[test]
    fn queued_then_sticky() {
        let transport = MockTransport::new();
        transport.set_response("export configuration", RawResponse::ok("<config/>"));
        transport.push_response("export configuration", RawResponse::new(500, ""));

        let request = Request::ExportConfiguration;
        assert_eq!(transport.execute(&request).unwrap().status, 500);
        assert_eq!(transport.execute(&request).unwrap().body, "<config/>");
        assert_eq!(transport.call_types(), vec!["export configuration"; 2]);
    }

    #[test]
    fn scripted_error() {
        let transport = MockTransport::new();
        transport.push_error("show commit locks", TransportErrorKind::Timeout, "read timed out");

        let request: Request = OpCommand::ShowLocks(LockKind::Commit).into();
        let err = transport.execute(&request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request timeout occurred when connecting to Panorama: read timed out"
        );
    }

    #[test]
    fn unscripted_call_fails() {
        let transport = MockTransport::new();
        let err = transport.execute(&Request::ExportConfiguration).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(transport.calls(), vec![Request::ExportConfiguration]);
    }
}
