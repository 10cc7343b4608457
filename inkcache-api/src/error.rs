//! HTTP error surface.
//!
//! Domain failures from decoding, rendering and storage are folded into one
//! `ApiError` and written as a JSON body. Client mistakes map to 400, unknown
//! paths to 404, everything else to 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inkcache_core::{ConfigError, DecodeError, MalformedOutput, RenderError, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::PipelineError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Machine-readable error code, serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404)
    // ========================================================================
    /// The `mermaid` query parameter is absent or empty
    MissingPayload,

    /// The payload could not be decompressed into diagram text
    InvalidPayload,

    /// No route matches the request path
    NotFound,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// The renderer could not be launched or failed to evaluate the diagram
    RenderFailed,

    /// The renderer did not answer within the render timeout
    RenderTimeout,

    /// The renderer answered with something that is not an SVG document
    MalformedOutput,

    /// A cache or stats store operation failed
    StorageError,

    /// Startup configuration could not be used
    InvalidConfig,

    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingPayload | ErrorCode::InvalidPayload => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::RenderFailed
            | ErrorCode::RenderTimeout
            | ErrorCode::MalformedOutput
            | ErrorCode::StorageError
            | ErrorCode::InvalidConfig
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message used when a failure carries no more specific text.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::MissingPayload => "Missing mermaid parameter",
            ErrorCode::InvalidPayload => "Invalid mermaid payload",
            ErrorCode::NotFound => "Not found",
            ErrorCode::RenderFailed => "Failed to render diagram",
            ErrorCode::RenderTimeout => "Diagram rendering timed out",
            ErrorCode::MalformedOutput => "Renderer returned malformed output",
            ErrorCode::StorageError => "Storage operation failed",
            ErrorCode::InvalidConfig => "Invalid configuration",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// JSON error body: `{"code": ..., "message": ..., "details": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Structured context, e.g. why a payload failed to decode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create a NotFound error for a path.
    pub fn not_found(path: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("No route for {}", path))
    }

    /// Create a StorageError.
    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MissingPayload => ApiError::from_code(ErrorCode::MissingPayload),
            DecodeError::InvalidPayload { reason } => {
                ApiError::from_code(ErrorCode::InvalidPayload)
                    .with_details(serde_json::json!({ "reason": reason }))
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        // Renderer internals stay in the logs.
        tracing::error!(error = %err, "Render failed");
        match err {
            RenderError::Timeout { after } => ApiError::new(
                ErrorCode::RenderTimeout,
                format!("Diagram rendering timed out after {}s", after.as_secs()),
            ),
            RenderError::LaunchFailure { .. } | RenderError::EvaluationFailure { .. } => {
                ApiError::from_code(ErrorCode::RenderFailed)
            }
        }
    }
}

impl From<MalformedOutput> for ApiError {
    fn from(err: MalformedOutput) -> Self {
        tracing::error!(prefix = %err.prefix, "Renderer returned malformed output");
        ApiError::from_code(ErrorCode::MalformedOutput)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Decode(e) => e.into(),
            PipelineError::Render(e) => e.into(),
            PipelineError::MalformedOutput(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage error");
        ApiError::from_code(ErrorCode::StorageError)
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::InvalidConfig, err.to_string())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
