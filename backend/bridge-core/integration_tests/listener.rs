use crate::helpers::{advertised_port, answer, negotiator, post_json, send_raw, send_raw_bytes};

use bridge_core::config::NegotiationMode;
use bridge_core::error::NegotiationError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;

/// **VALUE**: Verifies the full ajax path end to end.
///
/// **WHY THIS MATTERS**: In listener mode the frontend answers with an HTTP
/// POST to the advertised loopback port instead of a channel message.
///
/// **BUG THIS CATCHES**: Would catch a wrong advertised port, a listener that
/// never resolves, or a success reply with the wrong body.
#[tokio::test]
async fn given_listener_mode_when_frontend_posts_answer_then_negotiation_completes() {
    // GIVEN: A negotiation running in listener mode
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };

    // WHEN: The frontend POSTs its config to the advertised port
    let port = advertised_port(&mut frontend).await;
    let reply = post_json(port, &answer("http://localhost:8888").to_string()).await;

    // THEN: 200 `{}` and the config is available
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "{}");
    assert!(reply.head.contains("access-control-allow-origin: *"));
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
    assert_eq!(
        negotiator
            .get_config()
            .expect("resolved")
            .negotiated()
            .map(|c| c.frontend.clone()),
        Some("jupyterlab".to_string())
    );
}

/// **VALUE**: Verifies bad requests are rejected without ending the session.
///
/// **WHY THIS MATTERS**: A stray or oversized request must not consume the
/// one-shot listener; the real answer may still arrive.
///
/// **BUG THIS CATCHES**: Would catch the cap being off by one, or a rejected
/// request stopping the listener.
#[tokio::test]
async fn given_oversized_request_when_posted_then_400_and_valid_answer_still_accepted() {
    // GIVEN: A listener session
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };
    let port = advertised_port(&mut frontend).await;

    // WHEN: A request declares one byte over the cap (headers only)
    let oversized = send_raw(
        port,
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 513\r\n\r\n",
    )
    .await;

    // THEN: 400 with the cap in the message
    assert_eq!(oversized.status, 400);
    assert!(
        oversized
            .body
            .contains("Content-Length exceeds maximum of 512 bytes")
    );

    // WHEN: A valid answer follows on the same port
    let reply = post_json(port, &answer("http://localhost:8888").to_string()).await;

    // THEN: It is accepted
    assert_eq!(reply.status, 200);
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
}

/// **VALUE**: Verifies field validation and its error body.
///
/// **BUG THIS CATCHES**: Would catch an incomplete answer being stored.
#[tokio::test]
async fn given_answer_missing_base_subpath_when_posted_then_400_with_field_name() {
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };
    let port = advertised_port(&mut frontend).await;

    let reply = post_json(
        port,
        r#"{"type":"base_url_response","server_url":"http://localhost:8888","frontend":"notebook"}"#,
    )
    .await;

    assert_eq!(reply.status, 400);
    assert!(reply.head.contains("content-type: application/json"));
    let body: serde_json::Value = serde_json::from_str(&reply.body).expect("json error body");
    assert_eq!(body["error"], "Missing required field: base_subpath");
    assert!(negotiator.get_config().is_err());

    post_json(port, &answer("http://localhost:8888").to_string()).await;
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
}

#[tokio::test]
async fn given_wrong_method_or_content_type_when_requested_then_rejected() {
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };
    let port = advertised_port(&mut frontend).await;

    let get = send_raw(port, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(get.status, 405);

    let preflight = send_raw(port, "OPTIONS / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(preflight.status, 204);
    assert!(preflight.head.contains("access-control-allow-methods: post, options"));

    let plain = send_raw(
        port,
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    assert_eq!(plain.status, 400);
    assert!(plain.body.contains("Content-Type must be application/json"));

    post_json(port, &answer("http://localhost:8888").to_string()).await;
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
}

/// **VALUE**: Verifies the listener gives up at its deadline and releases the port.
///
/// **WHY THIS MATTERS**: A frontend without the extension never POSTs; the
/// kernel must not hold a socket open forever.
///
/// **BUG THIS CATCHES**: Would catch the accept loop ignoring the deadline.
#[tokio::test]
async fn given_no_post_when_deadline_passes_then_not_ready_and_port_closed() {
    // GIVEN: A short listener session nobody answers
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_millis(250))).await })
    };
    let port = advertised_port(&mut frontend).await;

    // WHEN: The deadline passes
    let result = worker.await.expect("worker task");

    // THEN: NotReady naming the listener operation, and the port is closed
    match result {
        Err(NegotiationError::NotReady { operation, .. }) => {
            assert_eq!(operation, "ProxyNegotiator::request_config_via_listener");
        }
        other => panic!("expected NotReady, got {other:?}"),
    }
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

/// **VALUE**: Verifies an already-negotiated process skips the listener.
///
/// **BUG THIS CATCHES**: Would catch a second ajax request being advertised
/// after the config is known.
#[tokio::test]
async fn given_config_already_resolved_when_request_via_listener_then_nothing_sent() {
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    frontend.deliver(answer("http://localhost:8888"));

    negotiator
        .request_config_via_listener(Some(Duration::from_millis(100)))
        .await
        .expect("already negotiated");

    assert!(frontend.sent_messages().is_empty());
}

/// **VALUE**: Verifies a channel answer ends a running listener session.
///
/// **WHY THIS MATTERS**: Both reply paths resolve the same state. A frontend
/// may answer over the channel even after being asked to POST.
///
/// **BUG THIS CATCHES**: Would catch the accept loop polling until its
/// deadline and reporting NotReady while the config is already available.
#[tokio::test]
async fn given_listener_session_when_answer_arrives_over_channel_then_negotiation_completes() {
    // GIVEN: A listener session with a long deadline
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };
    let port = advertised_port(&mut frontend).await;

    // WHEN: The frontend answers over the channel instead
    let started = Instant::now();
    frontend.deliver(answer("http://localhost:8888"));

    // THEN: Negotiation succeeds well before the deadline and the port is released
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(negotiator.get_config().is_ok());
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

/// **VALUE**: Verifies an idle connection does not hold up the answer.
///
/// **WHY THIS MATTERS**: Browsers open speculative sockets that never send a
/// request; the real POST must not queue behind them.
///
/// **BUG THIS CATCHES**: Would catch connections being served one at a time.
#[tokio::test]
async fn given_idle_connection_open_when_answer_posted_then_accepted_immediately() {
    // GIVEN: A listener session with an idle connection already accepted
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };
    let port = advertised_port(&mut frontend).await;
    let _idle = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("idle connection");
    tokio::time::sleep(Duration::from_millis(150)).await;

    // WHEN: The real answer is posted
    let started = Instant::now();
    let reply = post_json(port, &answer("http://localhost:8888").to_string()).await;

    // THEN: It is answered without waiting out the idle connection
    assert_eq!(reply.status, 200);
    assert!(started.elapsed() < Duration::from_millis(500));
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
}

/// **VALUE**: Verifies body decoding failures are rejected and serving continues.
///
/// **BUG THIS CATCHES**: Would catch a non-UTF-8 or non-JSON body ending the
/// session, or a chunked body slipping past the size cap because it declares
/// no Content-Length.
#[tokio::test]
async fn given_undecodable_or_unbounded_bodies_when_posted_then_400_and_still_serving() {
    // GIVEN: A listener session
    let (negotiator, mut frontend) = negotiator(NegotiationMode::Listener);
    let worker = {
        let negotiator = Arc::clone(&negotiator);
        tokio::spawn(async move { negotiator.negotiate(Some(Duration::from_secs(3))).await })
    };
    let port = advertised_port(&mut frontend).await;

    // WHEN: The body is not UTF-8
    let mut request =
        b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n"
            .to_vec();
    request.extend_from_slice(&[0xff, 0xfe]);
    let not_utf8 = send_raw_bytes(port, &request).await;

    // THEN: 400 naming the encoding
    assert_eq!(not_utf8.status, 400);
    assert!(not_utf8.body.contains("Request body is not valid UTF-8"));

    // WHEN: The body is not JSON
    let not_json = post_json(port, "{not json").await;

    // THEN: 400 naming the JSON failure
    assert_eq!(not_json.status, 400);
    assert!(not_json.body.contains("Request body is not valid JSON"));

    // WHEN: A chunked body without Content-Length overruns the cap
    let chunk = "a".repeat(600);
    let chunked = send_raw(
        port,
        &format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{chunk}\r\n0\r\n\r\n",
            chunk.len()
        ),
    )
    .await;

    // THEN: 400 naming the cap
    assert_eq!(chunked.status, 400);
    assert!(chunked.body.contains("exceeds maximum of 512 bytes"));

    // THEN: Nothing was stored and a valid answer is still accepted
    assert!(negotiator.get_config().is_err());
    let reply = post_json(port, &answer("http://localhost:8888").to_string()).await;
    assert_eq!(reply.status, 200);
    worker
        .await
        .expect("worker task")
        .expect("negotiation succeeds");
}
