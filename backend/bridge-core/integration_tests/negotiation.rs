use crate::helpers::{answer, answer_next_request, negotiator};

use bridge_core::channel::MemoryChannel;
use bridge_core::config::{BridgeConfig, NegotiationMode};
use bridge_core::error::NegotiationError;
use bridge_core::{ProxyConfig, ProxyNegotiator};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

/// **VALUE**: Verifies the basic channel round trip.
///
/// **WHY THIS MATTERS**: This is the primary negotiation path: one request
/// out, one answer in, config available synchronously afterwards.
///
/// **BUG THIS CATCHES**: Would catch the handler not being registered or the
/// request not being sent.
#[tokio::test]
async fn given_frontend_answers_when_request_config_then_get_config_returns_answer() {
    // GIVEN: An attached channel
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);

    // WHEN: Negotiating while the frontend answers
    let (result, request) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        answer_next_request(&mut frontend, answer("http://localhost:8888")),
    );

    // THEN: The request had the right shape and the config is available
    result.expect("negotiation succeeds");
    assert_eq!(request, json!({ "type": "base_url_request" }));
    let config = negotiator.get_config().expect("resolved");
    assert_eq!(
        config.negotiated().map(|c| c.server_url.as_str()),
        Some("http://localhost:8888")
    );
}

/// **VALUE**: Verifies concurrent callers share one request.
///
/// **WHY THIS MATTERS**: Notebook cells may trigger negotiation repeatedly;
/// the frontend must see a single `base_url_request`.
///
/// **BUG THIS CATCHES**: Would catch each call spawning its own task.
#[tokio::test]
async fn given_two_concurrent_calls_when_request_config_then_one_request_sent() {
    // GIVEN: An attached channel
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);

    // WHEN: Two calls race while the frontend answers once
    let (first, second, _) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        negotiator.request_config(Some(Duration::from_secs(2))),
        answer_next_request(&mut frontend, answer("http://localhost:8888")),
    );

    // THEN: Both succeed and only one request went out
    first.expect("first call");
    second.expect("second call");
    assert_eq!(frontend.sent_messages().len(), 1);
    assert!(frontend.try_recv().is_none());
}

/// **VALUE**: Verifies a timed-out wait leaves the request outstanding.
///
/// **WHY THIS MATTERS**: The frontend may answer after the first caller gave
/// up. The late answer must satisfy the next call without a second request.
///
/// **BUG THIS CATCHES**: Would catch the timeout cancelling the underlying
/// task, which would lose the answer and force a resend.
#[tokio::test]
async fn given_short_timeout_when_answer_arrives_late_then_next_call_succeeds_without_resend() {
    // GIVEN: A frontend that does not answer in time
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);

    // WHEN: The first call times out after 50ms
    let first = negotiator
        .request_config(Some(Duration::from_millis(50)))
        .await;

    // THEN: It reports NotReady and nothing is stored
    assert!(matches!(first, Err(NegotiationError::NotReady { .. })));
    assert!(negotiator.get_config().is_err());

    // WHEN: A second call waits while the frontend answers the original request
    let (second, _) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        answer_next_request(&mut frontend, answer("http://late:8888")),
    );

    // THEN: The second call sees the answer and exactly one request was sent
    second.expect("second call");
    assert_eq!(frontend.sent_messages().len(), 1);
    assert!(!negotiator.get_config().expect("resolved").is_detached());
}

/// **VALUE**: Verifies the accessor never waits and reports NotReady before
/// negotiation.
///
/// **BUG THIS CATCHES**: Would catch `get_config` returning an empty mapping
/// while attached, which callers would mistake for "no proxy".
#[test]
fn given_attached_channel_when_get_config_before_negotiation_then_not_ready() {
    let (negotiator, _frontend) = negotiator(NegotiationMode::Channel);

    let result = negotiator.get_config();

    match result {
        Err(e) => {
            assert!(e.is_not_ready());
            assert!(e.to_string().contains("ProxyNegotiator::negotiate"));
        }
        Ok(config) => panic!("expected NotReady, got {config:?}"),
    }
}

/// **VALUE**: Verifies the detached case is inert.
///
/// **WHY THIS MATTERS**: Outside any frontend, negotiation must be a no-op and
/// the accessor must return an empty mapping.
#[tokio::test]
async fn given_detached_channel_when_negotiate_then_noop_and_empty_config() {
    // GIVEN: A channel with no frontend
    let negotiator = ProxyNegotiator::new(
        Arc::new(MemoryChannel::detached()),
        BridgeConfig::default(),
    );

    // WHEN: Negotiating in both modes
    negotiator.negotiate(None).await.expect("no-op");
    negotiator.request_config(None).await.expect("no-op");

    // THEN: The config is the empty detached value
    let config = negotiator.get_config().expect("detached never fails");
    assert_eq!(config, ProxyConfig::Detached);
    assert!(config.to_map().is_empty());
}

/// **VALUE**: Verifies malformed answers are ignored and negotiation continues.
///
/// **BUG THIS CATCHES**: Would catch a bad answer ending the task with an error.
#[tokio::test]
async fn given_malformed_then_valid_answer_when_request_config_then_resolves_with_valid() {
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);

    let frontend_side = async {
        frontend.recv().await.expect("request");
        frontend.deliver(json!({ "type": "base_url_response", "server_url": "x" }));
        tokio::time::sleep(Duration::from_millis(20)).await;
        frontend.deliver(answer("http://good:8888"));
    };
    let (result, _) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        frontend_side,
    );

    result.expect("resolved by the valid answer");
    assert_eq!(
        negotiator
            .get_config()
            .expect("resolved")
            .negotiated()
            .map(|c| c.server_url.clone()),
        Some("http://good:8888".to_string())
    );
}

/// **VALUE**: Verifies a failed send is retried by the next call.
///
/// **WHY THIS MATTERS**: A closed channel at first call must not poison
/// negotiation for the rest of the process.
///
/// **BUG THIS CATCHES**: Would catch the failed task staying cached so every
/// later call returns the same transport error.
#[tokio::test]
async fn given_closed_channel_when_request_config_then_transport_error_and_retry_resends() {
    // GIVEN: A frontend that closed the channel
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);
    frontend.close();

    // WHEN: Negotiating
    let first = negotiator.request_config(Some(Duration::from_secs(1))).await;

    // THEN: Transport error, nothing sent
    assert!(matches!(first, Err(NegotiationError::Transport { .. })));
    assert!(frontend.sent_messages().is_empty());

    // WHEN: The channel is reopened by an outbound send and negotiation retried
    negotiator
        .send(json!({ "type": "ping" }))
        .await
        .expect("send reopens");
    frontend.recv().await.expect("ping");
    let (second, request) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        answer_next_request(&mut frontend, answer("http://localhost:8888")),
    );

    // THEN: A fresh request went out and negotiation completed
    second.expect("retry succeeds");
    assert_eq!(request["type"], "base_url_request");
}

/// **VALUE**: Verifies `send` reopens a closed channel before sending.
///
/// **BUG THIS CATCHES**: Would catch messages being sent on a closed channel
/// and silently lost.
#[tokio::test]
async fn given_closed_channel_when_send_then_reopened_and_delivered() {
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);
    frontend.close();

    negotiator
        .send(json!({ "type": "dash_app", "url": "/proxy/8050/" }))
        .await
        .expect("send");

    assert!(frontend.is_open());
    assert_eq!(frontend.open_count(), 1);
    assert_eq!(
        frontend.recv().await,
        Some(json!({ "type": "dash_app", "url": "/proxy/8050/" }))
    );
}

/// **VALUE**: Verifies restart discards the stored config and sends anew.
///
/// **BUG THIS CATCHES**: Would catch restart leaving the old task cached.
#[tokio::test]
async fn given_resolved_negotiation_when_restart_then_next_call_sends_new_request() {
    // GIVEN: A completed negotiation
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Channel);
    let (first, _) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        answer_next_request(&mut frontend, answer("http://old:8888")),
    );
    first.expect("first negotiation");

    // WHEN: Restarting
    negotiator.restart();

    // THEN: The config is gone and a new negotiation sends a second request
    assert!(negotiator.get_config().is_err());
    let (second, _) = tokio::join!(
        negotiator.request_config(Some(Duration::from_secs(2))),
        answer_next_request(&mut frontend, answer("http://new:8888")),
    );
    second.expect("second negotiation");
    assert_eq!(frontend.sent_messages().len(), 2);
    assert_eq!(
        negotiator
            .get_config()
            .expect("resolved")
            .negotiated()
            .map(|c| c.server_url.clone()),
        Some("http://new:8888".to_string())
    );
}
