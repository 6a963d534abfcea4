use crate::error::reply::MalformedReply;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys every frontend answer must carry, in validation order.
pub const REQUIRED_FIELDS: [&str; 4] = ["type", "server_url", "base_subpath", "frontend"];

/// Proxy configuration reported by the frontend.
///
/// Keys beyond the four required ones are kept in `extra` so that
/// [`NegotiatedConfig::to_map`] reproduces the payload exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiatedConfig {
    #[serde(rename = "type")]
    pub message_type: String,
    pub server_url: String,
    pub base_subpath: String,
    pub frontend: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NegotiatedConfig {
    /// Validate a decoded payload and convert it.
    ///
    /// Fields are checked in [`REQUIRED_FIELDS`] order so the first missing
    /// one is the one reported.
    pub fn from_payload(payload: Value) -> Result<Self, MalformedReply> {
        let Value::Object(mut object) = payload else {
            return Err(MalformedReply::NotAnObject);
        };

        for field in REQUIRED_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => return Err(MalformedReply::MissingField { field }),
                Some(Value::String(_)) => {}
                Some(_) => return Err(MalformedReply::InvalidField { field }),
            }
        }

        let message_type = take_string(&mut object, "type")?;
        let server_url = take_string(&mut object, "server_url")?;
        let base_subpath = take_string(&mut object, "base_subpath")?;
        let frontend = take_string(&mut object, "frontend")?;

        Ok(Self {
            message_type,
            server_url,
            base_subpath,
            frontend,
            extra: object,
        })
    }

    /// The configuration as the flat mapping the frontend sent.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(self.message_type.clone()));
        map.insert("server_url".into(), Value::String(self.server_url.clone()));
        map.insert(
            "base_subpath".into(),
            Value::String(self.base_subpath.clone()),
        );
        map.insert("frontend".into(), Value::String(self.frontend.clone()));
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

fn take_string(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<String, MalformedReply> {
    match object.remove(field) {
        Some(Value::String(value)) => Ok(value),
        _ => Err(MalformedReply::MissingField { field }),
    }
}

/// What the config accessor hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyConfig {
    /// No frontend counterpart exists; the configuration is empty.
    Detached,

    /// The frontend answered.
    Negotiated(NegotiatedConfig),
}

impl ProxyConfig {
    pub fn is_detached(&self) -> bool {
        matches!(self, ProxyConfig::Detached)
    }

    pub fn negotiated(&self) -> Option<&NegotiatedConfig> {
        match self {
            ProxyConfig::Detached => None,
            ProxyConfig::Negotiated(config) => Some(config),
        }
    }

    /// Empty for [`ProxyConfig::Detached`], the frontend payload otherwise.
    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            ProxyConfig::Detached => Map::new(),
            ProxyConfig::Negotiated(config) => config.to_map(),
        }
    }
}
