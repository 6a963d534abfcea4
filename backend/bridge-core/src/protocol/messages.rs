use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// `type` tag carried by every frontend answer.
pub const BASE_URL_RESPONSE: &str = "base_url_response";

const TYPE_KEY: &str = "type";

/// Requests the kernel sends to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelRequest {
    /// Ask the frontend to answer over the channel.
    BaseUrlRequest,

    /// Ask the frontend to POST its answer to a loopback port.
    ///
    /// The port travels as a decimal string.
    BaseUrlRequestAjax { port: String },
}

impl KernelRequest {
    pub fn ajax(port: u16) -> Self {
        KernelRequest::BaseUrlRequestAjax {
            port: port.to_string(),
        }
    }
}

impl From<KernelRequest> for Value {
    fn from(request: KernelRequest) -> Self {
        match request {
            KernelRequest::BaseUrlRequest => json!({ "type": "base_url_request" }),
            KernelRequest::BaseUrlRequestAjax { port } => {
                json!({ "type": "base_url_request_ajax", "port": port })
            }
        }
    }
}

/// The `type` discriminator of an inbound payload, if it has one.
pub fn message_type(payload: &Value) -> Option<&str> {
    payload.get(TYPE_KEY).and_then(Value::as_str)
}
