use proxy_config::cli::Cli;
use proxy_config::error::{AppError, EXIT_NOT_READY};
use proxy_config::run::run;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Integration tests for the command flow: settings -> channel -> negotiation
// ============================================================================

/// Frontend that answers `base_url_request` when `answer` is true, and
/// otherwise reads frames without replying.
async fn start_frontend(answer: bool) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");

        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let envelope: Value = serde_json::from_str(text.as_str()).expect("envelope");
            if answer && envelope["data"]["type"] == "base_url_request" {
                let reply = json!({
                    "target_name": "jupyter_dash",
                    "data": {
                        "type": "base_url_response",
                        "server_url": "http://localhost:8888",
                        "base_subpath": "/",
                        "frontend": "notebook",
                    },
                });
                ws.send(Message::Text(reply.to_string().into()))
                    .await
                    .expect("send reply");
            }
        }
    });

    port
}

fn cli(config_dir: &TempDir, extra: &[&str]) -> Cli {
    let dir = config_dir.path().to_string_lossy().to_string();
    let mut args = vec!["proxy-config", "--config-dir", dir.as_str()];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).expect("valid args")
}

/// **VALUE**: Verifies the detached invocation prints an empty mapping.
///
/// **WHY THIS MATTERS**: Scripts call the command outside any notebook; it
/// must succeed with `{}` rather than fail.
#[tokio::test]
async fn given_no_frontend_url_when_run_then_empty_mapping() {
    let config_dir = TempDir::new().expect("temp dir");

    let config = run(&cli(&config_dir, &[])).await.expect("detached run");

    assert!(config.is_empty());
}

/// **VALUE**: Verifies the command negotiates over a WebSocket frontend.
///
/// **BUG THIS CATCHES**: Would catch the CLI building the channel with the
/// wrong target name or mode.
#[tokio::test]
async fn given_answering_frontend_when_run_in_channel_mode_then_mapping_returned() {
    // GIVEN: A frontend that answers
    let port = start_frontend(true).await;
    let config_dir = TempDir::new().expect("temp dir");
    let url = format!("ws://127.0.0.1:{port}");

    // WHEN: Running in channel mode
    let config = run(&cli(
        &config_dir,
        &["--frontend-url", url.as_str(), "--mode", "channel", "--timeout", "3s"],
    ))
    .await
    .expect("negotiated");

    // THEN: The frontend's mapping is returned as sent
    assert_eq!(
        Value::Object(config),
        json!({
            "type": "base_url_response",
            "server_url": "http://localhost:8888",
            "base_subpath": "/",
            "frontend": "notebook",
        })
    );
}

/// **VALUE**: Verifies a silent frontend ends in the NotReady exit status.
///
/// **WHY THIS MATTERS**: Callers distinguish "retry later" from "broken setup"
/// by the exit status.
///
/// **BUG THIS CATCHES**: Would catch the command hanging past its timeout or
/// reporting a generic failure.
#[tokio::test]
async fn given_silent_frontend_when_run_then_not_ready_error() {
    let port = start_frontend(false).await;
    let config_dir = TempDir::new().expect("temp dir");
    let url = format!("ws://127.0.0.1:{port}");

    let result = run(&cli(
        &config_dir,
        &["--frontend-url", url.as_str(), "--mode", "channel", "--timeout", "200ms"],
    ))
    .await;

    match result {
        Err(e @ AppError::NotReady { .. }) => assert_eq!(e.exit_code(), EXIT_NOT_READY),
        other => panic!("expected NotReady, got {other:?}"),
    }
}
