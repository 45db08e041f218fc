//! Error types for a3s-session

use thiserror::Error;

/// Errors that can occur in the session filter
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration is structurally valid JSON but semantically wrong
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A session with this id is already indexed
    #[error("Session already exists: {0}")]
    DuplicateSession(String),

    /// A header value cannot be carried on the wire
    #[error("Invalid value for header '{name}': {reason}")]
    InvalidHeader {
        name: String,
        reason: String,
    },
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
