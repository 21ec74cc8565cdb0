//! Integration Tests for the Admin API
//!
//! Tests the full request/response cycle for each endpoint against a cache
//! the test also holds a handle to.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use query_cache::{
    api::create_router, AppState, CacheConfig, EntryOptions, QueryCache, WarmerRegistry,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, Arc<QueryCache>) {
    let cache = Arc::new(QueryCache::new(CacheConfig::default().with_max_entries(100)));
    let mut warmers = WarmerRegistry::with_builtins();
    warmers.register("failing", |_params| async move {
        Err(anyhow::anyhow!("upstream unavailable"))
    });
    let state = AppState::new(cache.clone(), warmers);
    (create_router(state), cache)
}

fn seed(cache: &QueryCache) {
    cache.set("q:agency:1", json!({"id": 1}), EntryOptions::new().tags(["agencies"]));
    cache.set("q:agency:2", json!({"id": 2}), EntryOptions::new().tags(["agencies"]));
    cache.set("q:contact:1", json!({"id": 3}), EntryOptions::new().tags(["contacts"]));
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_counts() {
    let (app, cache) = create_test_app();
    seed(&cache);
    cache.get("q:agency:1");
    cache.get("q:agency:1");
    cache.get("q:missing");

    let response = app.oneshot(get("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["evictions"], 0);
    assert_eq!(json["entry_count"], 3);
    assert!(json["approx_size_bytes"].as_u64().unwrap() > 0);

    let hit_rate = json["hit_rate"].as_f64().unwrap();
    assert!((hit_rate - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_stats_on_empty_cache() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;

    assert_eq!(json["entry_count"], 0);
    assert_eq!(json["hit_rate"].as_f64().unwrap(), 0.0);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint_ok() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "OK");
    assert!(json["warnings"].as_array().unwrap().is_empty());
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_health_endpoint_degraded_near_capacity() {
    let cache = Arc::new(QueryCache::new(CacheConfig::default().with_max_entries(10)));
    for i in 0..10 {
        cache.set(format!("k{i}"), json!(i), EntryOptions::new());
    }
    let app = create_router(AppState::new(cache, WarmerRegistry::with_builtins()));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "DEGRADED");
    assert!(!json["warnings"].as_array().unwrap().is_empty());
}

// == CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint() {
    let (app, cache) = create_test_app();
    seed(&cache);
    cache.get("q:agency:1");

    let response = app.oneshot(post_json("/clear", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["cleared"], 3);
    assert!(cache.is_empty());
    assert_eq!(cache.stats().hits, 0);
}

// == INVALIDATE_TAG Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_tag_endpoint() {
    let (app, cache) = create_test_app();
    seed(&cache);

    let response = app
        .clone()
        .oneshot(post_json("/invalidate_tag", json!({"tag": "agencies"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert_eq!(json["tag"], "agencies");
    assert!(cache.get("q:agency:1").is_none());
    assert!(cache.get("q:contact:1").is_some());

    // Second call finds nothing left
    let response = app
        .oneshot(post_json("/invalidate_tag", json!({"tag": "agencies"})))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 0);
}

#[tokio::test]
async fn test_invalidate_tag_blank_is_bad_request() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(post_json("/invalidate_tag", json!({"tag": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == INVALIDATE_PATTERN Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_pattern_endpoint() {
    let (app, cache) = create_test_app();
    seed(&cache);

    let response = app
        .oneshot(post_json(
            "/invalidate_pattern",
            json!({"pattern": "^q:agency:"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert_eq!(cache.keys(), vec!["q:contact:1".to_string()]);
    assert!(cache.keys_for_tag("agencies").is_empty());
}

#[tokio::test]
async fn test_invalidate_pattern_invalid_regex() {
    let (app, cache) = create_test_app();
    seed(&cache);

    let response = app
        .oneshot(post_json("/invalidate_pattern", json!({"pattern": "[unclosed"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid pattern"));
    assert_eq!(cache.len(), 3);
}

// == WARM Endpoint Tests ==

#[tokio::test]
async fn test_warm_endpoint_literal() {
    let (app, cache) = create_test_app();

    let body = json!({
        "entries": [
            {"key": "q:warm:1", "warmer": "literal", "params": {"rows": [1]}, "tags": ["warm"]},
            {"key": "q:warm:2", "warmer": "literal", "params": [2], "ttl_ms": 60000}
        ]
    });
    let response = app.oneshot(post_json("/warm", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["warmed"], 2);
    assert_eq!(json["skipped"], 0);
    assert!(json["failed"].as_array().unwrap().is_empty());

    assert_eq!(*cache.get("q:warm:1").unwrap(), json!({"rows": [1]}));
    assert_eq!(cache.tags_of("q:warm:1"), Some(vec!["warm".to_string()]));
}

#[tokio::test]
async fn test_warm_endpoint_skips_live_keys_unless_forced() {
    let (app, cache) = create_test_app();
    cache.set("q:warm:1", json!("old"), EntryOptions::new());

    let body = json!({"entries": [{"key": "q:warm:1", "warmer": "literal", "params": "new"}]});
    let response = app.clone().oneshot(post_json("/warm", body)).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["skipped"], 1);
    assert_eq!(*cache.get("q:warm:1").unwrap(), json!("old"));

    let body = json!({"entries": [{"key": "q:warm:1", "warmer": "literal", "params": "new", "force": true}]});
    let response = app.oneshot(post_json("/warm", body)).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["warmed"], 1);
    assert_eq!(*cache.get("q:warm:1").unwrap(), json!("new"));
}

#[tokio::test]
async fn test_warm_endpoint_reports_failures() {
    let (app, cache) = create_test_app();

    let body = json!({
        "entries": [
            {"key": "q:ok", "warmer": "literal", "params": 1},
            {"key": "q:bad", "warmer": "failing"}
        ]
    });
    let response = app.oneshot(post_json("/warm", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["warmed"], 1);
    let failed = json["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["key"], "q:bad");
    assert!(failed[0]["error"].as_str().unwrap().contains("upstream unavailable"));

    assert!(cache.contains("q:ok"));
    assert!(!cache.contains("q:bad"));
}

#[tokio::test]
async fn test_warm_endpoint_unknown_warmer() {
    let (app, cache) = create_test_app();

    let body = json!({"entries": [{"key": "q:1", "warmer": "does_not_exist"}]});
    let response = app.oneshot(post_json("/warm", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_warmed_entry_expires() {
    let (app, cache) = create_test_app();

    let body = json!({"entries": [{"key": "q:short", "warmer": "literal", "params": 1, "ttl_ms": 50}]});
    let response = app.oneshot(post_json("/warm", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache.get("q:short").is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.get("q:short").is_none());
}

// == Error Handling Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/invalidate_tag")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/get/some_key")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
