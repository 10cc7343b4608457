//! Error types for INKCACHE operations

use std::time::Duration;
use thiserror::Error;

/// Request decoding errors (client errors).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Missing required 'mermaid' query parameter")]
    MissingPayload,

    #[error("Invalid diagram payload: {reason}")]
    InvalidPayload { reason: String },
}

/// Renderer failures. Never retried, never cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Renderer launch failed: {reason}")]
    LaunchFailure { reason: String },

    #[error("Diagram evaluation failed: {reason}")]
    EvaluationFailure { reason: String },

    #[error("Render timed out after {after:?}")]
    Timeout { after: Duration },
}

/// Renderer returned something that is not an image document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Renderer returned malformed output starting with {prefix:?}")]
pub struct MalformedOutput {
    /// Leading characters of the rejected output, for diagnostics.
    pub prefix: String,
}

/// Cache store and stats store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend error: {reason}")]
    Backend { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Corrupt record under key {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all INKCACHE errors.
#[derive(Debug, Clone, Error)]
pub enum InkError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Output error: {0}")]
    Malformed(#[from] MalformedOutput),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for INKCACHE operations.
pub type InkResult<T> = Result<T, InkError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================
