pub mod channel;
pub mod config;
pub mod error;
pub mod listener;
pub mod negotiation;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use negotiation::ProxyNegotiator;
pub use protocol::{NegotiatedConfig, ProxyConfig};

pub const COMM_TARGET_NAME: &str = "jupyter_dash";
pub const LISTENER_HOSTNAME: &str = "127.0.0.1";
