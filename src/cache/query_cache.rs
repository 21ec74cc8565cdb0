//! Query Cache
//!
//! The shared, thread-safe cache handle. Owns the entry store behind one
//! data-plane lock and the singleflight registry behind another.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::flight::{Flights, Role};
use crate::cache::{
    estimate_size, CacheConfig, CacheStats, CacheStore, EntryOptions, HealthReport, WarmEntry,
    WarmFailure, WarmReport, MAX_PATTERN_LENGTH,
};
use crate::error::{CacheError, ProducerError, Result};

/// Expired entries collected before a health report.
const HEALTH_SWEEP_BATCH: usize = 256;

// == Fetch Result ==
/// Where a `get_or_compute` value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Served from a live entry
    Hit,
    /// Produced by this caller
    Computed,
    /// Produced by a concurrent caller this one waited on
    Coalesced,
}

/// Value returned by [`QueryCache::get_or_compute`].
#[derive(Debug, Clone)]
pub struct Fetched<V> {
    pub value: Arc<V>,
    pub source: FetchSource,
}

impl<V> Fetched<V> {
    fn new(value: Arc<V>, source: FetchSource) -> Self {
        Self { value, source }
    }

    /// True unless this caller ran the producer itself.
    pub fn cached(&self) -> bool {
        self.source != FetchSource::Computed
    }
}

// == Query Cache ==
/// In-process result cache for expensive, repeatable queries.
///
/// Construct once at startup and share through an `Arc`. Values are handed
/// out as `Arc<V>` and must be treated as read-only.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(QueryCache::new(CacheConfig::default()));
/// let fetched = cache
///     .get_or_compute("q:agency:ny", EntryOptions::new().tags(["agencies"]), || async {
///         run_search().await
///     })
///     .await?;
/// ```
pub struct QueryCache<V = Value> {
    store: Mutex<CacheStore<V>>,
    flights: Flights<V>,
    config: CacheConfig,
    coalesced: AtomicU64,
    producer_failures: AtomicU64,
}

impl<V> QueryCache<V>
where
    V: Serialize + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: Mutex::new(CacheStore::new(config.clone())),
            flights: Flights::new(),
            config,
            coalesced: AtomicU64::new(0),
            producer_failures: AtomicU64::new(0),
        }
    }

    // == Entry Store ==
    /// Returns the live value for `key`, counting a hit or a miss.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.store.lock().get(key)
    }

    /// Whether a live entry exists; affects neither counters nor recency.
    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().peek(key).is_some()
    }

    /// Stores `value`, replacing any existing entry for `key` wholesale.
    pub fn set(&self, key: impl Into<String>, value: V, options: EntryOptions) {
        self.store_value(key.into(), Arc::new(value), &options);
    }

    /// Removes `key`; returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.store.lock().delete(key)
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.store.lock().size_bytes()
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.lock().keys()
    }

    pub fn tags_of(&self, key: &str) -> Option<Vec<String>> {
        self.store.lock().tags_of(key)
    }

    /// Time left on a live entry; `Some(None)` when it never expires.
    pub fn ttl_remaining(&self, key: &str) -> Option<Option<Duration>> {
        self.store.lock().ttl_remaining(key)
    }

    // == Invalidation ==
    /// Snapshot of the keys carrying `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> HashSet<String> {
        self.store.lock().keys_for_tag(tag)
    }

    /// Removes every entry carrying `tag`; returns how many were removed.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        self.store.lock().invalidate_by_tag(tag)
    }

    /// Removes every entry whose key matches the regular expression
    /// `pattern`.
    ///
    /// Fails with [`CacheError::InvalidPattern`] before touching any state
    /// when the pattern does not compile. O(n) in the number of keys.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize> {
        let regex = compile_pattern(pattern)?;
        Ok(self.invalidate_matching(&regex))
    }

    /// Removes every entry whose key matches an already compiled pattern.
    pub fn invalidate_matching(&self, pattern: &Regex) -> usize {
        self.store.lock().invalidate_matching(pattern)
    }

    /// Drops every entry and resets all counters; returns the number of
    /// entries dropped. Computations already in flight still store their
    /// result when they finish.
    pub fn clear(&self) -> usize {
        let cleared = self.store.lock().clear();
        self.coalesced.store(0, Ordering::Relaxed);
        self.producer_failures.store(0, Ordering::Relaxed);
        info!(cleared, "cache cleared");
        cleared
    }

    /// Removes up to `batch` expired entries under a single lock hold.
    pub fn sweep_expired(&self, batch: usize) -> usize {
        self.store.lock().sweep_expired(batch)
    }

    // == Stats & Health ==
    pub fn stats(&self) -> CacheStats {
        let in_flight = self.flights.len();
        let mut stats = self.store.lock().stats();
        stats.coalesced = self.coalesced.load(Ordering::Relaxed);
        stats.producer_failures = self.producer_failures.load(Ordering::Relaxed);
        stats.in_flight = in_flight;
        stats
    }

    /// Evaluates health after collecting one batch of expired entries, so
    /// dead entries the sweep has not reached yet do not inflate
    /// utilization. A backlog larger than the batch can still be counted.
    pub fn health(&self) -> HealthReport {
        self.sweep_expired(HEALTH_SWEEP_BATCH);
        HealthReport::evaluate(&self.stats(), &self.config)
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, or runs `producer` to fill it.
    ///
    /// Concurrent callers for the same cold key share one producer run:
    /// the first becomes leader, the rest wait for its outcome. A failed
    /// producer caches nothing and every waiter receives the same error.
    /// Waiters give up after `options.wait_timeout` without affecting the
    /// leader. When callers pass different options, the leader's win.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: impl Into<String>,
        options: EntryOptions,
        producer: F,
    ) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let key = key.into();
        if let Some(value) = self.get(&key) {
            return Ok(Fetched::new(value, FetchSource::Hit));
        }

        let fetched = self.coalesce(key.clone(), options, producer, true).await?;
        if fetched.source == FetchSource::Hit {
            // Another leader stored the value after our miss was counted.
            self.store.lock().convert_miss_to_hit(&key);
        }
        Ok(fetched)
    }

    /// Recomputes `key` even if a live entry exists, still sharing the run
    /// with any concurrent computation of the same key.
    pub async fn refresh<F, Fut>(
        &self,
        key: impl Into<String>,
        options: EntryOptions,
        producer: F,
    ) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        self.coalesce(key.into(), options, producer, false).await
    }

    // == Warm ==
    /// Pre-populates a batch of keys, running up to
    /// `config.warm_concurrency` producers at once.
    ///
    /// Keys that are already live are skipped unless the entry is forced.
    /// A failing producer is recorded in the report and does not stop the
    /// rest of the batch.
    pub async fn warm(&self, entries: Vec<WarmEntry<V>>) -> WarmReport {
        let this = self;
        let outcomes: Vec<(String, Result<Option<FetchSource>>)> = stream::iter(entries)
            .map(move |entry| async move {
                let key = entry.key.clone();
                (key, this.warm_one(entry).await)
            })
            .buffer_unordered(self.config.warm_concurrency.max(1))
            .collect()
            .await;

        let mut report = WarmReport::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(Some(_)) => report.warmed += 1,
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    warn!(key = %key, error = %err, "warm entry failed");
                    report.failed.push(WarmFailure {
                        key,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            warmed = report.warmed,
            skipped = report.skipped,
            failed = report.failed.len(),
            "warm batch finished"
        );
        report
    }

    async fn warm_one(&self, entry: WarmEntry<V>) -> Result<Option<FetchSource>> {
        let WarmEntry {
            key,
            options,
            force,
            producer,
        } = entry;

        if !force && self.contains(&key) {
            return Ok(None);
        }

        let fetched = self.coalesce(key, options, producer, !force).await?;
        Ok(match fetched.source {
            FetchSource::Hit => None,
            source => Some(source),
        })
    }

    /// Runs `producer` as leader for `key`, or waits on the current leader.
    async fn coalesce<F, Fut>(
        &self,
        key: String,
        options: EntryOptions,
        producer: F,
        reuse_cached: bool,
    ) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let role = self.flights.join(&key, || {
            if reuse_cached {
                self.store.lock().peek(&key)
            } else {
                None
            }
        });

        match role {
            Role::Cached(value) => Ok(Fetched::new(value, FetchSource::Hit)),
            Role::Follower(follower) => {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                let value = follower.wait(options.wait_timeout).await?;
                Ok(Fetched::new(value, FetchSource::Coalesced))
            }
            Role::Leader(leader) => match producer().await {
                Ok(value) => {
                    let value = Arc::new(value);
                    self.store_value(key, Arc::clone(&value), &options);
                    leader.finish(Ok(Arc::clone(&value)));
                    Ok(Fetched::new(value, FetchSource::Computed))
                }
                Err(err) => {
                    self.producer_failures.fetch_add(1, Ordering::Relaxed);
                    let err: ProducerError = Arc::new(err);
                    leader.finish(Err(Arc::clone(&err)));
                    Err(CacheError::Producer(err))
                }
            },
        }
    }

    fn store_value(&self, key: String, value: Arc<V>, options: &EntryOptions) {
        let size = options
            .size_hint
            .unwrap_or_else(|| estimate_size(value.as_ref()));
        let evicted = self
            .store
            .lock()
            .insert(key, value, options.ttl, &options.tags, size);
        if evicted > 0 {
            debug!(evicted, "capacity eviction after write");
        }
    }
}

impl<V> Default for QueryCache<V>
where
    V: Serialize + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Compiles an invalidation pattern, rejecting overlong or invalid input.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(CacheError::InvalidPattern(format!(
            "pattern exceeds maximum length of {} characters",
            MAX_PATTERN_LENGTH
        )));
    }
    Regex::new(pattern).map_err(|e| CacheError::InvalidPattern(format!("'{}': {}", pattern, e)))
}
