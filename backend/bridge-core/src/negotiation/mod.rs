//! Proxy-config negotiation between the kernel and its frontend.
//!
//! [`ProxyNegotiator`] owns the [`ConfigState`] and the channel, and exposes
//! the whole public surface:
//!
//! - [`ProxyNegotiator::negotiate`] / [`ProxyNegotiator::request_config`] /
//!   [`ProxyNegotiator::request_config_via_listener`] - asynchronous negotiation
//! - [`ProxyNegotiator::get_config`] - synchronous, non-blocking read
//! - [`ProxyNegotiator::send`] - best-effort outbound message

pub mod config_state;
mod handler;
mod negotiator;

pub use config_state::{Completion, CompletionObserver, ConfigState};
pub use negotiator::ProxyNegotiator;

#[cfg(test)]
pub(crate) use handler::{HandledMessage, handle_frontend_message};

/// Operation named in `NotReady` errors raised before negotiation ran.
pub const NEGOTIATE_OPERATION: &str = "ProxyNegotiator::negotiate";

/// Operation named in `NotReady` errors from a timed-out channel wait.
pub const REQUEST_CONFIG_OPERATION: &str = "ProxyNegotiator::request_config";

/// Operation named in `NotReady` errors from an expired listener session.
pub const LISTENER_OPERATION: &str = "ProxyNegotiator::request_config_via_listener";
