//! Warmer Registry
//!
//! HTTP requests cannot carry producer closures, so the host registers named
//! warmers at startup and `POST /warm` refers to them by name.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::cache::{EntryOptions, WarmEntry};
use crate::error::{CacheError, Result};
use crate::models::WarmRequest;

/// Name of the built-in warmer that caches its params verbatim.
pub const LITERAL_WARMER: &str = "literal";

/// A named producer taking JSON params.
pub type Warmer = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Warmers available to the admin surface.
#[derive(Clone, Default)]
pub struct WarmerRegistry {
    warmers: HashMap<String, Warmer>,
}

impl WarmerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `literal` warmer.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(LITERAL_WARMER, |params| async move { Ok(params) });
        registry
    }

    /// Registers `warmer` under `name`, replacing any previous one.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, warmer: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let warmer: Warmer = Arc::new(move |params| warmer(params).boxed());
        self.warmers.insert(name.into(), warmer);
    }

    pub fn get(&self, name: &str) -> Option<Warmer> {
        self.warmers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.warmers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves every entry of `request` to a runnable warm entry.
    ///
    /// Fails on the first unknown warmer, before any producer runs.
    pub fn resolve(&self, request: WarmRequest) -> Result<Vec<WarmEntry<Value>>> {
        request
            .entries
            .into_iter()
            .map(|entry| {
                let warmer = self.get(&entry.warmer).ok_or_else(|| {
                    CacheError::InvalidRequest(format!(
                        "Unknown warmer '{}' for key '{}'",
                        entry.warmer, entry.key
                    ))
                })?;

                let mut options = EntryOptions::new().tags(entry.tags);
                if let Some(ttl_ms) = entry.ttl_ms {
                    options = options.ttl(Duration::from_millis(ttl_ms));
                }

                let params = entry.params;
                let warm_entry = WarmEntry::new(entry.key, options, move || warmer(params));
                Ok(if entry.force {
                    warm_entry.forced()
                } else {
                    warm_entry
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for WarmerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmerRegistry")
            .field("warmers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarmEntryRequest;
    use serde_json::json;

    fn entry(key: &str, warmer: &str) -> WarmEntryRequest {
        WarmEntryRequest {
            key: key.to_string(),
            warmer: warmer.to_string(),
            params: json!({"state": "NY"}),
            ttl_ms: Some(60_000),
            tags: vec!["search".to_string()],
            force: true,
        }
    }

    #[test]
    fn test_builtins() {
        let registry = WarmerRegistry::with_builtins();
        assert_eq!(registry.names(), vec![LITERAL_WARMER.to_string()]);
    }

    #[tokio::test]
    async fn test_literal_warmer_echoes_params() {
        let registry = WarmerRegistry::with_builtins();
        let warmer = registry.get(LITERAL_WARMER).unwrap();
        assert_eq!(warmer(json!([1, 2])).await.unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_resolve_maps_options() {
        let mut registry = WarmerRegistry::new();
        registry.register("agencies", |params| async move {
            Ok(json!({"query": params, "rows": []}))
        });

        let mut entries = registry
            .resolve(WarmRequest {
                entries: vec![entry("q:agency:ny", "agencies")],
            })
            .unwrap();
        let resolved = entries.remove(0);

        assert_eq!(resolved.key, "q:agency:ny");
        assert!(resolved.force);
        assert_eq!(resolved.options.ttl, Some(Duration::from_secs(60)));
        assert_eq!(resolved.options.tags, vec!["search"]);
        let value = (resolved.producer)().await.unwrap();
        assert_eq!(value["query"], json!({"state": "NY"}));
    }

    #[test]
    fn test_resolve_rejects_unknown_warmer() {
        let registry = WarmerRegistry::with_builtins();
        let result = registry.resolve(WarmRequest {
            entries: vec![entry("a", LITERAL_WARMER), entry("b", "missing")],
        });

        match result {
            Err(CacheError::InvalidRequest(msg)) => assert!(msg.contains("missing")),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }
}
