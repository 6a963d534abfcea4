//! Response builders. Every response carries the JSON content type and a
//! wildcard CORS origin so a browser frontend can read it.

use crate::error::reply::MalformedReply;
use crate::listener::validation::JSON_CONTENT_TYPE;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, HeaderValue,
};
use hyper::{Response, StatusCode};
use log::debug;
use serde_json::json;

pub(crate) type ReplyBody = Full<Bytes>;

pub(crate) fn success() -> Response<ReplyBody> {
    json_response(StatusCode::OK, "{}".to_string())
}

pub(crate) fn rejection(reason: &MalformedReply) -> Response<ReplyBody> {
    error(StatusCode::BAD_REQUEST, &reason.to_string())
}

pub(crate) fn error(status: StatusCode, message: &str) -> Response<ReplyBody> {
    json_response(status, json!({ "error": message }).to_string())
}

/// CORS preflight answer.
pub(crate) fn preflight() -> Response<ReplyBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

fn json_response(status: StatusCode, body: String) -> Response<ReplyBody> {
    debug!("Config listener replying {status}");
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
