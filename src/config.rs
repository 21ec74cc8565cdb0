//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold (0 = unbounded)
    pub max_entries: usize,
    /// Maximum approximate size of all entries in bytes (0 = unbounded)
    pub max_bytes: usize,
    /// HTTP server port for the admin surface
    pub server_port: u16,
    /// Interval between TTL sweeps in milliseconds
    pub sweep_interval_ms: u64,
    /// Maximum number of expired entries removed per lock acquisition
    pub sweep_batch_size: usize,
    /// Utilization percentage above which health reports DEGRADED
    pub health_high_water_percent: f64,
    /// Hit rate below which health reports DEGRADED
    pub health_min_hit_rate: f64,
    /// Lookups required before the hit rate floor applies
    pub health_min_samples: u64,
    /// Number of warm entries computed concurrently
    pub warm_concurrency: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `MAX_BYTES` - Maximum cache size in bytes (default: 0, unbounded)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL_MS` - TTL sweep frequency (default: 1000)
    /// - `SWEEP_BATCH_SIZE` - Entries removed per sweep batch (default: 256)
    /// - `HEALTH_HIGH_WATER_PERCENT` - Degraded utilization mark (default: 90)
    /// - `HEALTH_MIN_HIT_RATE` - Degraded hit rate floor (default: 0.25)
    /// - `HEALTH_MIN_SAMPLES` - Lookups before the floor applies (default: 100)
    /// - `WARM_CONCURRENCY` - Concurrent warm computations (default: 4)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            max_bytes: env_or("MAX_BYTES", defaults.max_bytes),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            sweep_interval_ms: env_or("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
            sweep_batch_size: env_or("SWEEP_BATCH_SIZE", defaults.sweep_batch_size),
            health_high_water_percent: env_or(
                "HEALTH_HIGH_WATER_PERCENT",
                defaults.health_high_water_percent,
            ),
            health_min_hit_rate: env_or("HEALTH_MIN_HIT_RATE", defaults.health_min_hit_rate),
            health_min_samples: env_or("HEALTH_MIN_SAMPLES", defaults.health_min_samples),
            warm_concurrency: env_or("WARM_CONCURRENCY", defaults.warm_concurrency),
        }
    }

    /// Engine-level settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_max_entries(self.max_entries)
            .with_max_bytes(self.max_bytes)
            .with_high_water_percent(self.health_high_water_percent)
            .with_min_hit_rate(self.health_min_hit_rate, self.health_min_samples)
            .with_warm_concurrency(self.warm_concurrency)
    }

    /// Interval between TTL sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_bytes: 0,
            server_port: 3000,
            sweep_interval_ms: 1000,
            sweep_batch_size: 256,
            health_high_water_percent: 90.0,
            health_min_hit_rate: 0.25,
            health_min_samples: 100,
            warm_concurrency: 4,
        }
    }
}

/// Reads and parses an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
