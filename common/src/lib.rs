//! Shared building blocks for the kernel bridge workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking
//! - **bridge-core**: negotiation protocol, transports and the one-shot listener
//! - **proxy-config**: command-line wiring around `bridge-core`
//!
//! Nothing in here knows about kernels or frontends.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
