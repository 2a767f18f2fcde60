//! Integration tests for the engine against the real HTTP stack.
//!
//! A tiny single-threaded HTTP server plays Panorama on a loopback port so
//! the request layout produced by `reqwest` is checked end to end.

use configpump_engine::{
    ConnectionConfig, EngineError, HttpTransport, MemorySyncTarget, Orchestrator,
    PanoramaTransport, PollConfig, TransportErrorKind,
};
use configpump_protocol::{LockKind, OpCommand, Request};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

struct Captured {
    request_line: String,
    body: String,
}

/// Serves `responses` in order, one connection each, and reports what it
/// received.
fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let (stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let captured = handle(stream, status, &body);
            if tx.send(captured).is_err() {
                return;
            }
        }
    });

    (base, rx)
}

fn handle(mut stream: TcpStream, status: u16, body: &str) -> Captured {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut request_body = vec![0u8; content_length];
    reader.read_exact(&mut request_body).unwrap();

    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).unwrap();
    stream.flush().unwrap();

    Captured {
        request_line: request_line.trim_end().to_string(),
        body: String::from_utf8_lossy(&request_body).into_owned(),
    }
}

fn config(base: &str) -> ConnectionConfig {
    ConnectionConfig::new(base, "SECRETKEY").with_timeout(Duration::from_secs(5))
}

#[test]
fn get_request_layout() {
    let (base, rx) = serve(vec![(
        200,
        "<response status=\"success\"><result><config-locks/></result></response>".into(),
    )]);
    let transport = HttpTransport::connect(&config(&base)).unwrap();

    let request: Request = OpCommand::ShowLocks(LockKind::Config).into();
    let response = transport.execute(&request).unwrap();
    assert_eq!(response.status, 200);
    assert!(response.body.contains("config-locks"));

    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(captured.request_line.starts_with("GET /api/?type=op&cmd="));
    assert!(captured.request_line.ends_with("&key=SECRETKEY HTTP/1.1"));
}

#[test]
fn import_is_multipart_upload() {
    let (base, rx) = serve(vec![(200, "<response status=\"success\"/>".into())]);
    let transport = HttpTransport::connect(&config(&base)).unwrap();

    let request = Request::ImportConfiguration {
        file_name: "configpump_fw1.xml".into(),
        content: "<config/>\n".into(),
    };
    transport.execute(&request).unwrap();

    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(captured
        .request_line
        .starts_with("POST /api/?type=import&category=configuration&key=SECRETKEY"));
    assert!(captured.body.contains("name=\"file\""));
    assert!(captured.body.contains("filename=\"configpump_fw1.xml\""));
    assert!(captured
        .body
        .to_lowercase()
        .contains("content-type: application/xml"));
    assert!(captured.body.contains("<config/>"));
}

#[test]
fn server_errors_are_http_errors() {
    let (base, _rx) = serve(vec![(500, "oops".into())]);
    let transport = HttpTransport::connect(&config(&base)).unwrap();

    match transport.execute(&Request::ExportConfiguration).unwrap_err() {
        EngineError::Transport { kind, message } => {
            assert_eq!(kind, TransportErrorKind::Http);
            assert!(message.contains("500"));
            assert!(!message.contains("SECRETKEY"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn pull_over_http() {
    let exported = "<config><devices><entry name=\"localhost.localdomain\"><template><entry name=\"T1\"><x/></entry><entry name=\"T2\"/></template></entry></devices></config>";
    let (base, _rx) = serve(vec![(200, exported.into())]);
    let transport = HttpTransport::connect(&config(&base)).unwrap();
    let orchestrator = Orchestrator::new(transport)
        .with_poll_config(PollConfig::new(1).with_interval(Duration::ZERO));

    let rendered = "<config><devices><entry name=\"localhost.localdomain\"><template><entry name=\"T1\"/></template></entry></devices></config>";
    let target = MemorySyncTarget::new("fw1", rendered);
    let outcome = orchestrator.pull(&target);

    assert!(outcome.success);
    let stored = target.stored().unwrap();
    assert!(stored.contains("T1"));
    assert!(!stored.contains("T2"));
}

#[test]
fn push_against_unreachable_endpoint_logs_and_fails() {
    let config = ConnectionConfig::new("http://127.0.0.1:1", "SECRETKEY")
        .with_timeout(Duration::from_secs(2));
    let orchestrator = Orchestrator::new(HttpTransport::connect(&config).unwrap());
    let target = MemorySyncTarget::new("fw1", "<config/>");

    let outcome = orchestrator.push(&target);
    assert!(!outcome.success);
    let entries = outcome.log.entries();
    assert_eq!(entries[0].call_type, "unexpected error");
    assert_eq!(entries.last().unwrap().call_type, "cleanup failed");
}
