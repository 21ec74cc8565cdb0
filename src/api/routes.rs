//! API Routes
//!
//! Configures the Axum router for the cache admin surface.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, invalidate_pattern_handler, invalidate_tag_handler,
    stats_handler, warm_handler, AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health report
/// - `POST /clear` - Drop every entry
/// - `POST /invalidate_tag` - Drop entries carrying a tag
/// - `POST /invalidate_pattern` - Drop entries whose key matches a regex
/// - `POST /warm` - Pre-populate keys through registered warmers
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/clear", post(clear_handler))
        .route("/invalidate_tag", post(invalidate_tag_handler))
        .route("/invalidate_pattern", post(invalidate_pattern_handler))
        .route("/warm", post(warm_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, EntryOptions, QueryCache};
    use crate::api::warmers::WarmerRegistry;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<QueryCache>) {
        let cache = Arc::new(QueryCache::new(CacheConfig::default()));
        let state = AppState::new(cache.clone(), WarmerRegistry::with_builtins());
        (create_router(state), cache)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalidate_tag_endpoint() {
        let (app, cache) = create_test_app();
        cache.set("q:1", json!(1), EntryOptions::new().tags(["agencies"]));

        let response = app
            .oneshot(post_json("/invalidate_tag", r#"{"tag":"agencies"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_bad_request() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(post_json("/invalidate_pattern", r#"{"pattern":"("}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_on_post_route_not_allowed() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/clear").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
