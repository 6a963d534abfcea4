use crate::helpers::answer;

use bridge_core::ProxyNegotiator;
use bridge_core::channel::WsChannel;
use bridge_core::config::{BridgeConfig, ChannelSettings, NegotiationMode};
use bridge_core::error::ChannelError;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Start a one-connection frontend that answers `base_url_request` over the
/// comm envelope. A frame for another target is sent first.
async fn start_frontend() -> (u16, tokio::task::JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let mut received = Vec::new();

        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let envelope: Value = serde_json::from_str(text.as_str()).expect("envelope");
            assert_eq!(envelope["target_name"], "jupyter_dash");
            received.push(envelope["data"].clone());

            if envelope["data"]["type"] == "base_url_request" {
                let decoy = json!({ "target_name": "other", "data": answer("http://decoy") });
                ws.send(Message::Text(decoy.to_string().into()))
                    .await
                    .expect("send decoy");

                let reply = json!({
                    "target_name": "jupyter_dash",
                    "data": answer("http://localhost:8888"),
                });
                ws.send(Message::Text(reply.to_string().into()))
                    .await
                    .expect("send reply");
            }
        }
        received
    });

    (port, handle)
}

/// **VALUE**: Verifies negotiation over a real WebSocket frontend.
///
/// **WHY THIS MATTERS**: This is the transport the CLI uses. Envelopes must
/// carry the target name both ways, and frames for other targets must be
/// ignored.
///
/// **BUG THIS CATCHES**: Would catch envelope shape drift or the decoy frame
/// resolving the negotiation.
#[tokio::test]
async fn given_ws_frontend_when_request_config_then_resolved_from_matching_target() {
    // GIVEN: A frontend and a connected channel
    let (port, frontend) = start_frontend().await;
    let channel = WsChannel::connect(&format!("ws://127.0.0.1:{port}"), &ChannelSettings::default())
        .await
        .expect("connect");
    let mut config = BridgeConfig::default();
    config.negotiation.mode = NegotiationMode::Channel;
    let negotiator = ProxyNegotiator::new(Arc::new(channel), config);

    // WHEN: Negotiating
    negotiator
        .negotiate(Some(Duration::from_secs(3)))
        .await
        .expect("negotiation succeeds");

    // THEN: The matching target's answer was used
    assert_eq!(
        negotiator
            .get_config()
            .expect("resolved")
            .negotiated()
            .map(|c| c.server_url.clone()),
        Some("http://localhost:8888".to_string())
    );

    drop(negotiator);
    let received = frontend.await.expect("frontend task");
    assert_eq!(received, vec![json!({ "type": "base_url_request" })]);
}

#[tokio::test]
async fn given_http_url_when_ws_connect_then_connect_error() {
    let result = WsChannel::connect("http://127.0.0.1:1", &ChannelSettings::default()).await;

    assert!(matches!(result, Err(ChannelError::Connect { .. })));
}

/// **VALUE**: Verifies connect gives up within its configured budget.
///
/// **BUG THIS CATCHES**: Would catch the backoff loop retrying forever.
#[tokio::test]
async fn given_unreachable_frontend_when_ws_connect_then_fails_within_budget() {
    // GIVEN: A port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let settings = ChannelSettings {
        connect_timeout: Duration::from_millis(300),
        ..ChannelSettings::default()
    };

    // WHEN: Connecting
    let started = std::time::Instant::now();
    let result = WsChannel::connect(&format!("ws://127.0.0.1:{port}"), &settings).await;

    // THEN: Connect error well before a generous upper bound
    assert!(matches!(result, Err(ChannelError::Connect { .. })));
    assert!(started.elapsed() < Duration::from_secs(3));
}
