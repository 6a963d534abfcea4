// Unit tests for error module
// Tests serialization and exit-code mapping

use crate::error::{AppError, EXIT_FAILURE, EXIT_NOT_READY};

use bridge_core::error::NegotiationError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Tests that errors serialize with their variant tag.
///
/// **WHY THIS MATTERS**: Wrapper scripts parse the JSON report on stderr to
/// decide whether to retry.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or changes the tag layout.
#[test]
fn given_app_error_when_serialized_then_contains_variant_and_message() {
    // GIVEN: An AppError
    let err = AppError::Channel {
        message: String::from("Test"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_string(&err).expect("serializable");

    // THEN: Variant tag and message are present
    assert!(json.contains(r#""type":"Channel""#), "JSON should carry the variant tag");
    assert!(json.contains("Test"), "JSON should contain message");
}

/// **VALUE**: Verifies a negotiation timeout maps to its own exit status.
///
/// **WHY THIS MATTERS**: NotReady is recoverable by re-running; every other
/// failure is not.
///
/// **BUG THIS CATCHES**: Would catch NotReady being folded into the generic
/// negotiation variant.
#[test]
fn given_not_ready_negotiation_error_when_converted_then_exit_not_ready() {
    let not_ready: AppError = NegotiationError::not_ready("ProxyNegotiator::negotiate").into();
    assert!(matches!(not_ready, AppError::NotReady { .. }));
    assert_eq!(not_ready.exit_code(), EXIT_NOT_READY);

    let transport: AppError = NegotiationError::Transport {
        message: String::from("closed"),
        location: ErrorLocation::from(Location::caller()),
    }
    .into();
    assert!(matches!(transport, AppError::Negotiation { .. }));
    assert_eq!(transport.exit_code(), EXIT_FAILURE);
}
