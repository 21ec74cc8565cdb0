//! Cache Entry Module
//!
//! Defines individual cache entries, their write options and size estimation.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

// == Entry Options ==
/// Write parameters for a cache entry.
///
/// A `ttl` of `None` or zero means the entry never expires and is subject to
/// eviction only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryOptions {
    /// Time-to-live measured from the write
    pub ttl: Option<Duration>,
    /// Invalidation labels; replaced wholesale on overwrite
    pub tags: Vec<String>,
    /// Approximate size in bytes; computed from the value when absent
    pub size_hint: Option<usize>,
    /// How long a singleflight follower waits for the leader
    pub wait_timeout: Option<Duration>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn size_hint(mut self, bytes: usize) -> Self {
        self.size_hint = Some(bytes);
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }
}

// == Cache Entry ==
/// A single cached query result with its metadata.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// Immutable snapshot of the computed result
    pub value: Arc<V>,
    /// Deduplicated invalidation labels
    pub tags: BTreeSet<String>,
    /// None = no expiration
    pub expires_at: Option<Instant>,
    /// Approximate size used for byte capacity accounting
    pub size_bytes: usize,
    /// Write sequence number; disambiguates entries sharing an expiry instant
    pub(crate) seq: u64,
    /// Position in the access-order list
    pub(crate) lru_slot: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry written at `now`.
    pub(crate) fn new(
        value: Arc<V>,
        ttl: Option<Duration>,
        tags: BTreeSet<String>,
        size_bytes: usize,
        now: Instant,
        seq: u64,
    ) -> Self {
        // A TTL too large to represent never expires.
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| now.checked_add(ttl));

        Self {
            value,
            tags,
            expires_at,
            size_bytes,
            seq,
            lru_slot: 0,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is logically absent at `now`.
    ///
    /// An entry is expired once `now` reaches its expiration instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the TTL left at `now`, or None if no expiration is set.
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }

    /// Key under which the entry is filed in the expiry index.
    pub(crate) fn expiry_key(&self) -> Option<(Instant, u64)> {
        self.expires_at.map(|at| (at, self.seq))
    }
}

// == Size Estimation ==
/// Approximates a value's footprint by the length of its JSON encoding.
///
/// Bytes are counted as they are written; no buffer is allocated.
pub fn estimate_size<V: Serialize>(value: &V) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(_) => std::mem::size_of_val(value),
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 = self.0.saturating_add(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
