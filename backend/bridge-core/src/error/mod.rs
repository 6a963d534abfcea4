pub mod channel;
pub mod config;
pub mod negotiation;
pub mod reply;

pub use channel::ChannelError;
pub use config::ConfigError;
pub use negotiation::NegotiationError;
pub use reply::MalformedReply;
