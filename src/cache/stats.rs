//! Cache Statistics Module
//!
//! Tracks cache performance counters and derives the operator health summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheConfig;

// == Cache Stats ==
/// Snapshot of cache counters.
///
/// Counters are monotonic for the life of the cache except on `clear`,
/// which resets them to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries removed to satisfy capacity
    pub evictions: u64,
    /// Entries removed because their TTL passed (lazily or by the sweep)
    pub expirations: u64,
    /// Entries removed by delete, tag or pattern invalidation
    pub invalidations: u64,
    /// Callers that joined an in-flight computation instead of producing
    pub coalesced: u64,
    /// Producer executions that failed
    pub producer_failures: u64,
    /// Computations running right now
    pub in_flight: usize,
    /// Current number of entries
    pub entry_count: usize,
    /// Approximate bytes held by all entries
    pub approx_size_bytes: usize,
    /// hits / (hits + misses), 0 when there were no lookups
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    /// Completes a snapshot with the current occupancy and derived rate.
    pub fn with_occupancy(mut self, entry_count: usize, size_bytes: usize) -> Self {
        self.entry_count = entry_count;
        self.approx_size_bytes = size_bytes;
        self.hit_rate = self.hit_rate();
        self
    }
}

// == Health ==
/// Advisory health of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Health summary for operators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub hit_rate: f64,
    pub entry_count: usize,
    /// Highest utilization across the configured capacity bounds
    pub utilization_percent: f64,
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Derives health from a stats snapshot and the configured thresholds.
    ///
    /// Degraded when utilization passes the high-water mark, or when the hit
    /// rate is under the floor once enough lookups have been seen.
    pub fn evaluate(stats: &CacheStats, config: &CacheConfig) -> Self {
        let utilization_percent =
            config.utilization_percent(stats.entry_count, stats.approx_size_bytes);
        let hit_rate = stats.hit_rate();
        let mut warnings = Vec::new();

        if utilization_percent > config.high_water_percent {
            warnings.push(format!(
                "utilization {:.1}% exceeds high-water mark {:.1}%",
                utilization_percent, config.high_water_percent
            ));
        }

        if stats.lookups() >= config.min_samples && hit_rate < config.min_hit_rate {
            warnings.push(format!(
                "hit rate {:.3} below floor {:.3} after {} lookups",
                hit_rate,
                config.min_hit_rate,
                stats.lookups()
            ));
        }

        let status = if warnings.is_empty() {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            hit_rate,
            entry_count: stats.entry_count,
            utilization_percent,
            warnings,
            timestamp: Utc::now(),
        }
    }
}
