//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via [`HttpClient`] so the request
//! layout can be tested without a network. [`ReqwestClient`] is the
//! production implementation.

use crate::config::ConnectionConfig;
use crate::error::{EngineError, EngineResult, TransportErrorKind};
use crate::transport::{PanoramaTransport, RawResponse};
use configpump_protocol::Request;
use reqwest::blocking::multipart::{Form, Part};
use std::error::Error as StdError;

/// Multipart field the configuration file is uploaded in.
pub const UPLOAD_FIELD: &str = "file";
/// Content type of uploaded configuration files.
pub const UPLOAD_CONTENT_TYPE: &str = "application/xml";

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request with query parameters.
    fn get(&self, url: &str, query: &[(&str, String)]) -> EngineResult<RawResponse>;

    /// Sends a multipart POST with one file field.
    fn post_file(
        &self,
        url: &str,
        query: &[(&str, String)],
        file_name: &str,
        content: &str,
    ) -> EngineResult<RawResponse>;
}

/// Blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client honoring the timeout and TLS settings of `config`.
    pub fn from_config(config: &ConnectionConfig) -> EngineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.ignore_ssl_warnings)
            .build()
            .map_err(classify)?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, query: &[(&str, String)]) -> EngineResult<RawResponse> {
        let response = self.client.get(url).query(query).send().map_err(classify)?;
        into_raw(response)
    }

    fn post_file(
        &self,
        url: &str,
        query: &[(&str, String)],
        file_name: &str,
        content: &str,
    ) -> EngineResult<RawResponse> {
        let part = Part::text(content.to_string())
            .file_name(file_name.to_string())
            .mime_str(UPLOAD_CONTENT_TYPE)
            .map_err(classify)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(url)
            .query(query)
            .multipart(form)
            .send()
            .map_err(classify)?;
        into_raw(response)
    }
}

fn into_raw(response: reqwest::blocking::Response) -> EngineResult<RawResponse> {
    let response = response.error_for_status().map_err(classify)?;
    let status = response.status().as_u16();
    let body = response.text().map_err(classify)?;
    Ok(RawResponse::new(status, body))
}

/// Maps a `reqwest` error onto a transport error category.
///
/// The URL is stripped first since it carries the API key.
fn classify(err: reqwest::Error) -> EngineError {
    let err = err.without_url();
    let message = error_chain(&err);
    let lowered = message.to_lowercase();

    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if ["certificate", "tls", "ssl"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        TransportErrorKind::Ssl
    } else if err.is_connect() {
        TransportErrorKind::Connection
    } else if err.is_status() {
        TransportErrorKind::Http
    } else if err.is_builder()
        || err.is_request()
        || err.is_body()
        || err.is_redirect()
        || err.is_decode()
    {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Unexpected
    };

    EngineError::transport(kind, message)
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Transport speaking the Panorama XML API over HTTP.
///
/// Every request goes to `<base>/api/` with the API key appended as the
/// `key` query parameter.
pub struct HttpTransport<C: HttpClient> {
    api_url: String,
    token: String,
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport for `config` using `client`.
    pub fn new(config: &ConnectionConfig, client: C) -> Self {
        Self {
            api_url: config.api_url(),
            token: config.token.clone(),
            client,
        }
    }

    /// The API endpoint requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl HttpTransport<ReqwestClient> {
    /// Creates a transport backed by a blocking `reqwest` client.
    pub fn connect(config: &ConnectionConfig) -> EngineResult<Self> {
        Ok(Self::new(config, ReqwestClient::from_config(config)?))
    }
}

impl<C: HttpClient> PanoramaTransport for HttpTransport<C> {
    fn execute(&self, request: &Request) -> EngineResult<RawResponse> {
        let mut query = request.query();
        query.push(("key", self.token.clone()));

        tracing::debug!(
            call_type = %request.call_type(),
            upload = request.is_upload(),
            "sending API request"
        );

        let response = match request {
            Request::ImportConfiguration { file_name, content } => {
                self.client
                    .post_file(&self.api_url, &query, file_name, content)
            }
            _ => self.client.get(&self.api_url, &query),
        }?;

        tracing::debug!(
            call_type = %request.call_type(),
            http_status = response.status,
            body_len = response.body.len(),
            "received API response"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configpump_protocol::{LockKind, OpCommand};
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Get {
            url: String,
            query: Vec<(String, String)>,
        },
        Post {
            url: String,
            query: Vec<(String, String)>,
            file_name: String,
            content: String,
        },
    }

    struct TestClient {
        sent: Mutex<Vec<Sent>>,
        response: Mutex<Option<RawResponse>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                response: Mutex::new(None),
            }
        }

        fn set_response(&self, response: RawResponse) {
            *self.response.lock() = Some(response);
        }

        fn reply(&self) -> EngineResult<RawResponse> {
            self.response.lock().clone().ok_or_else(|| {
                EngineError::transport(TransportErrorKind::Connection, "no route to host")
            })
        }
    }

    fn owned(query: &[(&str, String)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    impl HttpClient for TestClient {
        fn get(&self, url: &str, query: &[(&str, String)]) -> EngineResult<RawResponse> {
            self.sent.lock().push(Sent::Get {
                url: url.to_string(),
                query: owned(query),
            });
            self.reply()
        }

        fn post_file(
            &self,
            url: &str,
            query: &[(&str, String)],
            file_name: &str,
            content: &str,
        ) -> EngineResult<RawResponse> {
            self.sent.lock().push(Sent::Post {
                url: url.to_string(),
                query: owned(query),
                file_name: file_name.to_string(),
                content: content.to_string(),
            });
            self.reply()
        }
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("https://pano.example.com", "SECRET")
    }

    #[test]
    fn op_requests_are_gets_with_key_last() {
        let client = TestClient::new();
        client.set_response(RawResponse::ok("<response status=\"success\"/>"));
        let transport = HttpTransport::new(&config(), client);
        assert_eq!(transport.api_url(), "https://pano.example.com/api/");

        let request: Request = OpCommand::ShowLocks(LockKind::Config).into();
        let response = transport.execute(&request).unwrap();
        assert_eq!(response.status, 200);

        let sent = transport.client.sent.lock().clone();
        assert_eq!(
            sent,
            vec![Sent::Get {
                url: "https://pano.example.com/api/".into(),
                query: vec![
                    ("type".into(), "op".into()),
                    ("cmd".into(), "<show><config-locks></config-locks></show>".into()),
                    ("key".into(), "SECRET".into()),
                ],
            }]
        );
    }

    #[test]
    fn import_is_multipart_post() {
        let client = TestClient::new();
        client.set_response(RawResponse::ok("<response status=\"success\"/>"));
        let transport = HttpTransport::new(&config(), client);

        let request = Request::ImportConfiguration {
            file_name: "configpump_fw1.xml".into(),
            content: "<config/>\n".into(),
        };
        transport.execute(&request).unwrap();

        let sent = transport.client.sent.lock().clone();
        match &sent[0] {
            Sent::Post {
                query,
                file_name,
                content,
                ..
            } => {
                assert_eq!(query[0], ("type".into(), "import".into()));
                assert_eq!(query[1], ("category".into(), "configuration".into()));
                assert_eq!(query[2], ("key".into(), "SECRET".into()));
                assert_eq!(file_name, "configpump_fw1.xml");
                assert_eq!(content, "<config/>\n");
            }
            other => panic!("expected a POST, got {:?}", other),
        }
    }

    #[test]
    fn client_errors_propagate() {
        let transport = HttpTransport::new(&config(), TestClient::new());
        let err = transport.execute(&Request::ExportConfiguration).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection error occurred when connecting to Panorama: no route to host"
        );
    }

    #[test]
    fn unreachable_host_is_connection_error() {
        let config = ConnectionConfig::new("http://127.0.0.1:1", "SECRET")
            .with_timeout(std::time::Duration::from_secs(2));
        let transport = HttpTransport::connect(&config).unwrap();
        let err = transport.execute(&Request::ExportConfiguration).unwrap_err();
        match err {
            EngineError::Transport { kind, message } => {
                assert!(matches!(
                    kind,
                    TransportErrorKind::Connection | TransportErrorKind::Timeout
                ));
                assert!(!message.contains("SECRET"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
