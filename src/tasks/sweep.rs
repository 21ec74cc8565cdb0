//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries. Lazy
//! expiration on read keeps lookups correct; the sweep only bounds the memory
//! held by entries nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::QueryCache;

/// Drains every currently expired entry, `batch_size` at a time.
///
/// The data-plane lock is released and the task yields between batches, so
/// a large backlog never blocks other cache traffic for long.
pub async fn sweep_once<V>(cache: &QueryCache<V>, batch_size: usize) -> usize
where
    V: Serialize + Send + Sync + 'static,
{
    let batch_size = batch_size.max(1);
    let mut total = 0;

    loop {
        let removed = cache.sweep_expired(batch_size);
        total += removed;
        if removed < batch_size {
            break;
        }
        tokio::task::yield_now().await;
    }

    total
}

/// Spawns a background task that periodically sweeps expired entries.
///
/// # Arguments
/// * `cache` - Shared cache handle
/// * `interval` - Time between sweeps
/// * `batch_size` - Maximum entries removed per lock acquisition
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop sweeping during
/// shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(QueryCache::new(CacheConfig::default()));
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(1), 256);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V>(
    cache: Arc<QueryCache<V>>,
    interval: Duration,
    batch_size: usize,
) -> JoinHandle<()>
where
    V: Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {}ms, batch size {}",
            interval.as_millis(),
            batch_size
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = sweep_once(&cache, batch_size).await;
            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}
