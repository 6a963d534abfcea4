use crate::error::channel::ChannelError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures surfaced by the negotiation surface.
///
/// `Clone` because one outcome is shared by every caller awaiting the same
/// negotiation task.
#[derive(Debug, Clone, ThisError)]
pub enum NegotiationError {
    /// Negotiation has not completed yet. Recoverable by re-running `operation`.
    #[error(
        "Not Ready Error: proxy configuration not negotiated yet, re-run `{operation}` {location}"
    )]
    NotReady {
        operation: &'static str,
        location: ErrorLocation,
    },

    /// The completion was resolved a second time. Indicates a logic bug.
    #[error("Double Resolution Error: {message} {location}")]
    DoubleResolution {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    #[error("Listener Error: {message} {location}")]
    Listener {
        message: String,
        location: ErrorLocation,
    },

    #[error("Task Error: {message} {location}")]
    Task {
        message: String,
        location: ErrorLocation,
    },
}

impl NegotiationError {
    #[track_caller]
    pub fn not_ready(operation: &'static str) -> Self {
        NegotiationError::NotReady {
            operation,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, NegotiationError::NotReady { .. })
    }
}

impl From<ChannelError> for NegotiationError {
    #[track_caller]
    fn from(error: ChannelError) -> Self {
        NegotiationError::Transport {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IoError> for NegotiationError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        NegotiationError::Listener {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
