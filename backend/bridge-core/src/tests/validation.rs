// Unit tests for listener request validation

use crate::error::reply::MalformedReply;
use crate::listener::validation::{check_headers, parse_body};

use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};

fn headers(content_type: Option<&'static str>, content_length: Option<&'static str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
    }
    if let Some(value) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static(value));
    }
    headers
}

/// **VALUE**: Verifies only the exact `application/json` media type passes.
///
/// **BUG THIS CATCHES**: Would catch a prefix match letting
/// `application/json; charset=utf-8` or `text/plain` through.
#[test]
fn given_wrong_content_type_when_check_headers_then_rejected() {
    assert_eq!(
        check_headers(&headers(Some("text/plain"), Some("2")), 512),
        Err(MalformedReply::ContentType)
    );
    assert_eq!(
        check_headers(&headers(Some("application/json; charset=utf-8"), Some("2")), 512),
        Err(MalformedReply::ContentType)
    );
    assert_eq!(
        check_headers(&headers(None, Some("2")), 512),
        Err(MalformedReply::ContentType)
    );
}

/// **VALUE**: Verifies the declared length is capped before the body is read.
///
/// **WHY THIS MATTERS**: The listener is reachable by any local process; an
/// oversized declaration must be refused without buffering it.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one at the cap.
#[test]
fn given_content_length_at_and_over_cap_when_check_headers_then_cap_enforced() {
    assert_eq!(
        check_headers(&headers(Some("application/json"), Some("512")), 512),
        Ok(512)
    );
    assert_eq!(
        check_headers(&headers(Some("application/json"), Some("513")), 512),
        Err(MalformedReply::ContentTooLarge { max: 512 })
    );
}

#[test]
fn given_unparseable_content_length_when_check_headers_then_invalid() {
    assert_eq!(
        check_headers(&headers(Some("application/json"), Some("-4")), 512),
        Err(MalformedReply::InvalidContentLength)
    );
    assert_eq!(
        check_headers(&headers(Some("application/json"), Some("ten")), 512),
        Err(MalformedReply::InvalidContentLength)
    );
}

#[test]
fn given_invalid_utf8_or_json_when_parse_body_then_rejected() {
    assert_eq!(
        parse_body(&[0xff, 0xfe, 0x7b]),
        Err(MalformedReply::InvalidUtf8)
    );
    assert!(matches!(
        parse_body(b"{not json"),
        Err(MalformedReply::InvalidJson { .. })
    ));
}

#[test]
fn given_valid_body_when_parse_body_then_config() {
    let body = br#"{"type":"base_url_response","server_url":"http://localhost:8888","base_subpath":"/","frontend":"jupyterlab"}"#;

    let config = parse_body(body).expect("valid body");

    assert_eq!(config.server_url, "http://localhost:8888");
    assert_eq!(config.frontend, "jupyterlab");
}
