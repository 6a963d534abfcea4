//! Test helpers for negotiation integration tests.
//!
//! - Building negotiators over an in-process channel
//! - Simulating the frontend's answers
//! - Raw HTTP/1.1 requests against the config listener

use bridge_core::ProxyNegotiator;
use bridge_core::channel::{FrontendEnd, MemoryChannel};
use bridge_core::config::{BridgeConfig, NegotiationMode};

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A complete `base_url_response` payload.
pub fn answer(server_url: &str) -> Value {
    json!({
        "type": "base_url_response",
        "server_url": server_url,
        "base_subpath": "/user/alice/",
        "frontend": "jupyterlab",
    })
}

/// Negotiator over a fresh in-process pair, using `mode`.
pub fn negotiator(mode: NegotiationMode) -> (Arc<ProxyNegotiator<MemoryChannel>>, FrontendEnd) {
    let (channel, frontend) = MemoryChannel::pair();
    let mut config = BridgeConfig::default();
    config.negotiation.mode = mode;
    (
        Arc::new(ProxyNegotiator::new(Arc::new(channel), config)),
        frontend,
    )
}

/// Wait for the next kernel request, then deliver `payload` as the answer.
pub async fn answer_next_request(frontend: &mut FrontendEnd, payload: Value) -> Value {
    let request = frontend.recv().await.expect("kernel request");
    frontend.deliver(payload);
    request
}

/// Read the advertised listener port from a `base_url_request_ajax`.
pub async fn advertised_port(frontend: &mut FrontendEnd) -> u16 {
    let request = frontend.recv().await.expect("ajax request");
    assert_eq!(request["type"], "base_url_request_ajax");
    request["port"]
        .as_str()
        .expect("port is a string")
        .parse()
        .expect("port is decimal")
}

/// Parsed HTTP reply.
pub struct HttpReply {
    pub status: u16,
    /// Header block, lowercased.
    pub head: String,
    pub body: String,
}

/// Send a raw HTTP request and read until the server closes the connection.
pub async fn send_raw(port: u16, request: &str) -> HttpReply {
    send_raw_bytes(port, request.as_bytes()).await
}

/// Like [`send_raw`], for requests that are not valid UTF-8.
pub async fn send_raw_bytes(port: u16, request: &[u8]) -> HttpReply {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("connect to listener");
    stream
        .write_all(request)
        .await
        .expect("write request");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read reply");
    let text = String::from_utf8_lossy(&raw).to_string();

    let (head, body) = text.split_once("\r\n\r\n").expect("header terminator");
    let status = head
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .expect("numeric status");

    HttpReply {
        status,
        head: head.to_ascii_lowercase(),
        body: body.to_string(),
    }
}

/// POST `body` as `application/json`.
pub async fn post_json(port: u16, body: &str) -> HttpReply {
    let request = format!(
        "POST / HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    send_raw(port, &request).await
}
