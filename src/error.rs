//! Error types for chunkd
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in chunkd
#[derive(Debug, Error)]
pub enum ChunkdError {
    /// Missing or unusable configuration (e.g. API key not set)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote generation call failed or returned no usable text
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Generated text could not be parsed as JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Generated JSON parsed but does not have the expected shape
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Caller input rejected
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Decomposition produced no usable chunks and no fallback was allowed
    #[error("Decomposition failed: {0}")]
    DecompositionFailed(String),

    /// A claimed task was reset or finished by someone else before completion
    #[error("Claim lost: {0}")]
    ClaimLost(String),

    /// Database error
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChunkdError {
    /// Errors caused by the remote generator rather than by us or the caller
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ChunkdError::Upstream(_)
                | ChunkdError::MalformedResponse(_)
                | ChunkdError::ShapeMismatch(_)
                | ChunkdError::DecompositionFailed(_)
        )
    }
}

/// Result type alias for chunkd operations
pub type Result<T> = std::result::Result<T, ChunkdError>;
