//! Kernel ↔ frontend message channel.
//!
//! The negotiation core only talks to the frontend through [`KernelChannel`].
//! Two implementations ship with the crate:
//!
//! - [`MemoryChannel`]: in-process loopback pair, used by tests and embedders
//!   that already own a message pump
//! - [`WsChannel`]: WebSocket client to a frontend bridge
//!
//! # Reliability
//!
//! Channels are assumed unreliable: they may be closed underneath the kernel
//! and may silently drop messages when the frontend tab is gone. `open` must be
//! idempotent so callers can reopen before every best-effort send.

mod memory;
mod ws;

pub use memory::{FrontendEnd, MemoryChannel};
pub use ws::WsChannel;

use crate::error::channel::ChannelError;

use std::future::Future;

use serde_json::Value;

/// Callback invoked with the data payload of every inbound message.
pub type MessageHandler = Box<dyn Fn(Value) + Send + Sync>;

/// Bidirectional message channel addressed by a fixed target name.
pub trait KernelChannel: Send + Sync + 'static {
    /// Whether a frontend counterpart exists at all.
    ///
    /// `false` means negotiation is meaningless (not running under a frontend).
    fn is_attached(&self) -> bool;

    /// Open the channel, or reopen it if the previous connection was lost.
    fn open(&self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Queue a message for the frontend. No acknowledgement is awaited.
    fn send(&self, message: Value) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Register the inbound message handler, replacing any previous one.
    fn on_message(&self, handler: MessageHandler);
}
