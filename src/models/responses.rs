//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies. Stats and health
//! payloads are the cache's own [`CacheStats`](crate::cache::CacheStats) and
//! [`HealthReport`](crate::cache::HealthReport).

use serde::Serialize;

/// Response body for POST /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Number of entries dropped
    pub cleared: usize,
}

/// Response body for POST /invalidate_tag
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateTagResponse {
    pub tag: String,
    /// Number of entries removed
    pub removed: usize,
}

/// Response body for POST /invalidate_pattern
#[derive(Debug, Clone, Serialize)]
pub struct InvalidatePatternResponse {
    pub pattern: String,
    /// Number of entries removed
    pub removed: usize,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
