//! Query Cache - an in-process result cache for expensive queries
//!
//! Provides TTL expiration, LRU eviction, tag and pattern invalidation and
//! coalescing of concurrent computations, plus a small HTTP admin surface.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState, WarmerRegistry};
pub use cache::{
    query_key, scoped_query_key, CacheConfig, EntryOptions, FetchSource, Fetched, QueryCache,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
