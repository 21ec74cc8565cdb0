//! API Handlers
//!
//! HTTP request handlers for the cache admin surface.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::api::warmers::WarmerRegistry;
use crate::cache::{CacheStats, HealthReport, QueryCache, WarmReport};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, InvalidatePatternRequest, InvalidatePatternResponse, InvalidateTagRequest,
    InvalidateTagResponse, WarmRequest,
};

/// Application state shared across all handlers.
///
/// The cache does its own locking, so handlers share it through a plain
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared query cache
    pub cache: Arc<QueryCache>,
    /// Named producers available to `POST /warm`
    pub warmers: Arc<WarmerRegistry>,
}

impl AppState {
    /// Creates a new AppState around an existing cache and warmer registry.
    pub fn new(cache: Arc<QueryCache>, warmers: WarmerRegistry) -> Self {
        Self {
            cache,
            warmers: Arc::new(warmers),
        }
    }

    /// Creates a new AppState from configuration with the built-in warmers.
    pub fn from_config(config: &crate::config::Config) -> Self {
        let cache = QueryCache::new(config.cache_config());
        Self::new(Arc::new(cache), WarmerRegistry::with_builtins())
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Handler for GET /health
///
/// Always answers 200; a degraded cache still serves traffic, so the state
/// is carried in the body.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.cache.health())
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.clear();
    Json(ClearResponse { cleared })
}

/// Handler for POST /invalidate_tag
pub async fn invalidate_tag_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateTagRequest>,
) -> Result<Json<InvalidateTagResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate_by_tag(&req.tag);
    info!(tag = %req.tag, removed, "invalidated by tag");

    Ok(Json(InvalidateTagResponse {
        tag: req.tag,
        removed,
    }))
}

/// Handler for POST /invalidate_pattern
///
/// Answers 400 when the pattern is not a valid regular expression; nothing
/// is removed in that case.
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<InvalidatePatternResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate_by_pattern(&req.pattern)?;
    info!(pattern = %req.pattern, removed, "invalidated by pattern");

    Ok(Json(InvalidatePatternResponse {
        pattern: req.pattern,
        removed,
    }))
}

/// Handler for POST /warm
///
/// Rejects the whole batch when any entry names an unknown warmer.
/// Producer failures are reported per key in the response body.
pub async fn warm_handler(
    State(state): State<AppState>,
    Json(req): Json<WarmRequest>,
) -> Result<Json<WarmReport>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let entries = state.warmers.resolve(req)?;
    let report = state.cache.warm(entries).await;

    Ok(Json(report))
}
