//! Error types for instances-link

use thiserror::Error;

/// Errors produced by the state synchronization engine and dataset pipeline.
///
/// Most of these never reach a caller: debounced writes, hydration and
/// migrations log the failure and report it through
/// [`EventHandlers::on_error`](crate::EventHandlers::on_error) instead.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Remote write failed ({status}): {body}")]
    RemoteWriteFailed { status: u16, body: String },

    #[error("Remote read of '{id}' failed ({status}): {body}")]
    RemoteReadFailed { id: String, status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Legacy data under '{key}' could not be parsed: {reason}")]
    MigrationParseFailed { key: String, reason: String },

    #[error("Shared state belongs to '{found}', not '{expected}'")]
    PathMismatch { expected: String, found: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type for instances-link operations
pub type Result<T> = std::result::Result<T, LinkError>;

impl From<reqwest::Error> for LinkError {
    fn from(err: reqwest::Error) -> Self {
        LinkError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for LinkError {
    fn from(err: url::ParseError) -> Self {
        LinkError::ConfigurationError(format!("Invalid URL: {}", err))
    }
}
