use thiserror::Error as ThisError;

/// Reasons a frontend answer is rejected.
///
/// The Display text is what goes back to the sender in the `{"error": ...}`
/// body, so it carries no source location.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MalformedReply {
    #[error("Content-Type must be application/json")]
    ContentType,

    #[error("Content-Length must be a non-negative integer")]
    InvalidContentLength,

    #[error("Content-Length exceeds maximum of {max} bytes")]
    ContentTooLarge { max: usize },

    #[error("Failed to read request body: {reason}")]
    BodyRead { reason: String },

    #[error("Request body is not valid UTF-8")]
    InvalidUtf8,

    #[error("Request body is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Field '{field}' must be a string")]
    InvalidField { field: &'static str },
}
