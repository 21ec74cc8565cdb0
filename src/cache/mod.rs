//! Cache Module
//!
//! In-memory query result caching with TTL expiration, LRU eviction,
//! tag and pattern invalidation, and singleflight stampede protection.

mod config;
mod entry;
mod flight;
mod key;
mod lru;
mod query_cache;
mod stats;
mod store;
mod tags;
mod warm;


// Re-export public types
pub use config::CacheConfig;
pub use entry::{estimate_size, CacheEntry, EntryOptions};
pub use key::{query_key, scoped_query_key};
pub use lru::LruTracker;
pub use query_cache::{compile_pattern, FetchSource, Fetched, QueryCache};
pub use stats::{CacheStats, HealthReport, HealthStatus};
pub use store::CacheStore;
pub use tags::TagIndex;
pub use warm::{Producer, WarmEntry, WarmFailure, WarmReport};

// == Public Constants ==
/// Maximum accepted length of an invalidation pattern
pub const MAX_PATTERN_LENGTH: usize = 1024;
