use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ChannelError {
    #[error("Channel Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Channel Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Channel Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Channel Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },
}

impl ChannelError {
    #[track_caller]
    pub fn closed(message: impl Into<String>) -> Self {
        ChannelError::Closed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ChannelError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ChannelError::Serialize {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
