// Unit tests for the inbound channel message handler

use crate::error::negotiation::NegotiationError;
use crate::error::reply::MalformedReply;
use crate::negotiation::{ConfigState, HandledMessage, handle_frontend_message};

use serde_json::json;

fn answer(server_url: &str) -> serde_json::Value {
    json!({
        "type": "base_url_response",
        "server_url": server_url,
        "base_subpath": "/",
        "frontend": "notebook",
    })
}

/// **VALUE**: Verifies a valid `base_url_response` resolves the cell.
///
/// **BUG THIS CATCHES**: Would catch the handler matching the wrong tag.
#[test]
fn given_base_url_response_when_handled_then_state_resolved() {
    let state = ConfigState::new();

    let outcome = handle_frontend_message(&state, answer("http://localhost:8888"));

    assert_eq!(outcome.expect("handled"), HandledMessage::Resolved);
    assert_eq!(
        state.snapshot().map(|c| c.server_url),
        Some("http://localhost:8888".to_string())
    );
}

/// **VALUE**: Verifies unrelated messages are ignored without touching state.
///
/// **WHY THIS MATTERS**: The channel carries other traffic; only config
/// answers may resolve the negotiation.
///
/// **BUG THIS CATCHES**: Would catch any message with a `server_url` being
/// taken as an answer.
#[test]
fn given_other_message_type_when_handled_then_ignored() {
    let state = ConfigState::new();

    let outcome = handle_frontend_message(
        &state,
        json!({ "type": "kernel_status", "server_url": "http://evil" }),
    );

    assert_eq!(outcome.expect("handled"), HandledMessage::Ignored);
    assert!(!state.is_resolved());
}

/// **VALUE**: Verifies a malformed answer leaves negotiation pending.
///
/// **BUG THIS CATCHES**: Would catch a half-filled config being stored.
#[test]
fn given_malformed_answer_when_handled_then_rejected_and_state_empty() {
    let state = ConfigState::new();

    let outcome = handle_frontend_message(
        &state,
        json!({ "type": "base_url_response", "server_url": "http://localhost:8888" }),
    );

    assert_eq!(
        outcome.expect("handled"),
        HandledMessage::Rejected(MalformedReply::MissingField {
            field: "base_subpath"
        })
    );
    assert!(!state.is_resolved());
}

#[test]
fn given_resolved_state_when_second_answer_handled_then_double_resolution() {
    let state = ConfigState::new();
    handle_frontend_message(&state, answer("http://first")).expect("first");

    let outcome = handle_frontend_message(&state, answer("http://second"));

    assert!(matches!(
        outcome,
        Err(NegotiationError::DoubleResolution { .. })
    ));
    assert_eq!(
        state.snapshot().map(|c| c.server_url),
        Some("http://first".to_string())
    );
}
