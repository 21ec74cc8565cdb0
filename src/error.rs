//! Error types for the query cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Failure reported by a caller-supplied producer.
///
/// Shared behind an `Arc` so the leader and every parked follower observe
/// the same error value.
pub type ProducerError = Arc<anyhow::Error>;

// == Cache Error Enum ==
/// Unified error type for the query cache.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Pattern did not compile as a regular expression
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Producer function failed; never cached
    #[error("Producer failed: {0}")]
    Producer(ProducerError),

    /// Follower gave up waiting for the in-flight computation
    #[error("Timed out after {waited_ms}ms waiting for in-flight computation of '{key}'")]
    Timeout { key: String, waited_ms: u64 },

    /// The leader of an in-flight computation went away without a result
    #[error("In-flight computation for '{0}' was abandoned")]
    Cancelled(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Producer(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the query cache.
pub type Result<T> = std::result::Result<T, CacheError>;
