//! Error types for the Shroud toolkit

use thiserror::Error;

/// Result type alias for Shroud operations
pub type Result<T> = std::result::Result<T, ShroudError>;

/// Main error type shared by the Shroud crates
#[derive(Debug, Error)]
pub enum ShroudError {
    /// A state-variable descriptor breaks the classification contract
    #[error("Invalid classification for '{state}': {reason}")]
    InvalidClassification { state: String, reason: String },

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other errors not covered by specific variants
    #[error("{0}")]
    Other(String),
}

impl ShroudError {
    pub fn invalid_classification(state: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClassification { state: state.into(), reason: reason.into() }
    }

    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<serde_json::Error> for ShroudError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
