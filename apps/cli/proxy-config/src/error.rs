use bridge_core::error::{ChannelError, ConfigError, NegotiationError};

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Exit status when the frontend did not answer in time.
pub const EXIT_NOT_READY: u8 = 2;

/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Errors reported by the `proxy-config` command.
///
/// Serialized to stderr as JSON so wrapper scripts can tell a slow frontend
/// from a broken setup.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum AppError {
    /// Error from this app (logging, output)
    #[error("App Error: {message} {location}")]
    App {
        message: String,
        location: ErrorLocation,
    },

    /// Settings could not be loaded or are invalid
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The frontend channel could not be opened or used
    #[error("Channel Error: {message} {location}")]
    Channel {
        message: String,
        location: ErrorLocation,
    },

    /// The frontend did not answer before the timeout
    #[error("Not Ready Error: {message} {location}")]
    NotReady {
        message: String,
        location: ErrorLocation,
    },

    /// Negotiation failed for another reason
    #[error("Negotiation Error: {message} {location}")]
    Negotiation {
        message: String,
        location: ErrorLocation,
    },
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::NotReady { .. } => EXIT_NOT_READY,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<ConfigError> for AppError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        AppError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ChannelError> for AppError {
    #[track_caller]
    fn from(error: ChannelError) -> Self {
        AppError::Channel {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<NegotiationError> for AppError {
    #[track_caller]
    fn from(error: NegotiationError) -> Self {
        let message = error.to_string();
        let location = ErrorLocation::from(Location::caller());
        if error.is_not_ready() {
            AppError::NotReady { message, location }
        } else {
            AppError::Negotiation { message, location }
        }
    }
}
