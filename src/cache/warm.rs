//! Cache Warming
//!
//! Batch pre-population of keys from caller-supplied producers.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

use crate::cache::EntryOptions;

/// Boxed one-shot producer used by warm batches.
pub type Producer<V> = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<V>> + Send>;

// == Warm Entry ==
/// One key to pre-populate.
pub struct WarmEntry<V> {
    pub key: String,
    pub options: EntryOptions,
    /// Recompute even when a live entry already exists
    pub force: bool,
    pub producer: Producer<V>,
}

impl<V> WarmEntry<V> {
    pub fn new<F, Fut>(key: impl Into<String>, options: EntryOptions, producer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        Self {
            key: key.into(),
            options,
            force: false,
            producer: Box::new(move || producer().boxed()),
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

impl<V> std::fmt::Debug for WarmEntry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmEntry")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("force", &self.force)
            .finish_non_exhaustive()
    }
}

// == Warm Report ==
/// A warm entry whose producer failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmFailure {
    pub key: String,
    pub error: String,
}

/// Result of a warm batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarmReport {
    /// Entries populated by this batch
    pub warmed: usize,
    /// Entries already present and not forced
    pub skipped: usize,
    pub failed: Vec<WarmFailure>,
}
