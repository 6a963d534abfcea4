//! One-shot loopback HTTP listener for the ajax reply path.
//!
//! The kernel binds an ephemeral port, tells the frontend about it with
//! `base_url_request_ajax`, and accepts a single valid JSON POST carrying
//! the proxy configuration.

mod reply;
mod session;
pub(crate) mod validation;

pub use session::ListenerSession;
