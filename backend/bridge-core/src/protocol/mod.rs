//! Wire vocabulary shared by the channel path and the fallback listener.
//!
//! Kernel → frontend requests are [`KernelRequest`] values; the frontend's
//! answer, whichever path it takes, is parsed into a [`NegotiatedConfig`].

mod messages;
mod negotiated_config;

pub use messages::{BASE_URL_RESPONSE, KernelRequest, message_type};
pub use negotiated_config::{NegotiatedConfig, ProxyConfig, REQUIRED_FIELDS};
