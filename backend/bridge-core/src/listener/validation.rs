use crate::error::reply::MalformedReply;
use crate::protocol::NegotiatedConfig;

use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use serde_json::Value;

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";

/// Check headers before any body is read. Returns the declared length.
///
/// The Content-Type must be exactly `application/json`; no parameters.
pub(crate) fn check_headers(headers: &HeaderMap, max_content_length: usize) -> Result<usize, MalformedReply> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
    if content_type != Some(JSON_CONTENT_TYPE) {
        return Err(MalformedReply::ContentType);
    }

    let declared = match headers.get(CONTENT_LENGTH) {
        None => 0,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|text| text.trim().parse::<usize>().ok())
            .ok_or(MalformedReply::InvalidContentLength)?,
    };

    if declared > max_content_length {
        return Err(MalformedReply::ContentTooLarge {
            max: max_content_length,
        });
    }

    Ok(declared)
}

/// Decode a collected body into a config: UTF-8, then JSON, then fields.
pub(crate) fn parse_body(body: &[u8]) -> Result<NegotiatedConfig, MalformedReply> {
    let text = std::str::from_utf8(body).map_err(|_| MalformedReply::InvalidUtf8)?;
    let payload: Value = serde_json::from_str(text).map_err(|e| MalformedReply::InvalidJson {
        reason: e.to_string(),
    })?;
    NegotiatedConfig::from_payload(payload)
}
