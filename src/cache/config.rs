//! Cache Configuration
//!
//! Capacity bounds, health thresholds and warm-up concurrency for a
//! [`QueryCache`](super::QueryCache).

// == Cache Configuration ==
/// Engine-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries (0 disables the bound)
    pub max_entries: usize,
    /// Maximum approximate bytes across all entries (0 disables the bound)
    pub max_bytes: usize,
    /// Utilization percentage above which health is degraded
    pub high_water_percent: f64,
    /// Hit rate below which health is degraded
    pub min_hit_rate: f64,
    /// Lookups needed before the hit-rate floor is evaluated
    pub min_samples: u64,
    /// Warm entries computed concurrently
    pub warm_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_bytes: 0,
            high_water_percent: 90.0,
            min_hit_rate: 0.25,
            min_samples: 100,
            warm_concurrency: 4,
        }
    }
}

impl CacheConfig {
    /// Set maximum entries
    pub fn with_max_entries(mut self, entries: usize) -> Self {
        self.max_entries = entries;
        self
    }

    /// Set maximum size in bytes
    pub fn with_max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = bytes;
        self
    }

    /// Set the utilization high-water mark
    pub fn with_high_water_percent(mut self, percent: f64) -> Self {
        self.high_water_percent = percent;
        self
    }

    /// Set the hit-rate floor and the sample size it needs
    pub fn with_min_hit_rate(mut self, rate: f64, min_samples: u64) -> Self {
        self.min_hit_rate = rate;
        self.min_samples = min_samples;
        self
    }

    /// Set warm-up concurrency (at least one)
    pub fn with_warm_concurrency(mut self, concurrency: usize) -> Self {
        self.warm_concurrency = concurrency.max(1);
        self
    }

    /// Whether `entries`/`bytes` exceed a configured bound.
    pub fn is_over_capacity(&self, entries: usize, bytes: usize) -> bool {
        (self.max_entries > 0 && entries > self.max_entries)
            || (self.max_bytes > 0 && bytes > self.max_bytes)
    }

    /// Highest utilization across the enabled bounds, in percent.
    pub fn utilization_percent(&self, entries: usize, bytes: usize) -> f64 {
        let by_entries = ratio_percent(entries, self.max_entries);
        let by_bytes = ratio_percent(bytes, self.max_bytes);
        by_entries.max(by_bytes)
    }
}

fn ratio_percent(used: usize, limit: usize) -> f64 {
    if limit == 0 {
        0.0
    } else {
        used as f64 / limit as f64 * 100.0
    }
}
