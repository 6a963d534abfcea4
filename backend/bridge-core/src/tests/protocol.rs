// Unit tests for protocol messages and reply parsing

use crate::error::reply::MalformedReply;
use crate::protocol::{KernelRequest, NegotiatedConfig, ProxyConfig, message_type};

use serde_json::{Map, Value, json};

// ============================================
// KERNEL REQUESTS
// ============================================

/// **VALUE**: Verifies the exact wire shape of both kernel requests.
///
/// **WHY THIS MATTERS**: The frontend extension matches on these literal
/// payloads. The ajax port must be a decimal string, not a number.
///
/// **BUG THIS CATCHES**: Would catch a renamed tag or a numeric port.
#[test]
fn given_kernel_requests_when_converted_to_json_then_match_wire_format() {
    let request: Value = KernelRequest::BaseUrlRequest.into();
    assert_eq!(request, json!({ "type": "base_url_request" }));

    let ajax: Value = KernelRequest::ajax(54321).into();
    assert_eq!(
        ajax,
        json!({ "type": "base_url_request_ajax", "port": "54321" })
    );
}

#[test]
fn given_payload_when_message_type_then_reads_type_tag() {
    assert_eq!(
        message_type(&json!({ "type": "base_url_response" })),
        Some("base_url_response")
    );
    assert_eq!(message_type(&json!({ "kind": "x" })), None);
    assert_eq!(message_type(&json!({ "type": 7 })), None);
    assert_eq!(message_type(&json!("base_url_response")), None);
}

// ============================================
// FRONTEND ANSWERS
// ============================================

/// **VALUE**: Verifies a complete answer is accepted and extra keys survive.
///
/// **WHY THIS MATTERS**: The accessor must return the mapping the frontend
/// sent; newer frontends add keys the kernel does not know about.
///
/// **BUG THIS CATCHES**: Would catch extra keys being dropped on parse.
#[test]
fn given_complete_answer_with_extra_key_when_from_payload_then_to_map_matches_payload() {
    // GIVEN: A full answer plus an unknown key
    let payload = json!({
        "type": "base_url_response",
        "server_url": "http://localhost:8888",
        "base_subpath": "/user/alice/",
        "frontend": "jupyterlab",
        "version": "4.1",
    });

    // WHEN: It is parsed
    let config = NegotiatedConfig::from_payload(payload.clone()).expect("valid");

    // THEN: Fields are typed and the flat mapping reproduces the payload
    assert_eq!(config.base_subpath, "/user/alice/");
    assert_eq!(config.frontend, "jupyterlab");
    assert_eq!(Value::Object(config.to_map()), payload);
}

/// **VALUE**: Verifies the first missing field, in declared order, is reported.
///
/// **BUG THIS CATCHES**: Would catch an answer lacking `base_subpath` being
/// accepted with an empty default.
#[test]
fn given_answer_missing_base_subpath_when_from_payload_then_missing_field() {
    let payload = json!({
        "type": "base_url_response",
        "server_url": "http://localhost:8888",
        "frontend": "notebook",
    });

    let result = NegotiatedConfig::from_payload(payload);

    assert_eq!(
        result,
        Err(MalformedReply::MissingField {
            field: "base_subpath"
        })
    );
    assert_eq!(
        MalformedReply::MissingField {
            field: "base_subpath"
        }
        .to_string(),
        "Missing required field: base_subpath"
    );
}

#[test]
fn given_null_or_non_string_field_when_from_payload_then_rejected() {
    let null_frontend = json!({
        "type": "base_url_response",
        "server_url": "http://localhost:8888",
        "base_subpath": "/",
        "frontend": null,
    });
    assert_eq!(
        NegotiatedConfig::from_payload(null_frontend),
        Err(MalformedReply::MissingField { field: "frontend" })
    );

    let numeric_url = json!({
        "type": "base_url_response",
        "server_url": 8888,
        "base_subpath": "/",
        "frontend": "jupyterlab",
    });
    assert_eq!(
        NegotiatedConfig::from_payload(numeric_url),
        Err(MalformedReply::InvalidField {
            field: "server_url"
        })
    );
}

#[test]
fn given_non_object_when_from_payload_then_not_an_object() {
    assert_eq!(
        NegotiatedConfig::from_payload(json!(["base_url_response"])),
        Err(MalformedReply::NotAnObject)
    );
}

/// **VALUE**: Verifies the detached accessor result is an empty mapping.
///
/// **WHY THIS MATTERS**: Code running outside any frontend must get `{}`,
/// never an error.
#[test]
fn given_detached_config_when_to_map_then_empty() {
    let config = ProxyConfig::Detached;

    assert!(config.is_detached());
    assert!(config.negotiated().is_none());
    assert_eq!(config.to_map(), Map::new());
}
