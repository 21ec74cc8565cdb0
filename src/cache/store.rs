//! Cache Store Module
//!
//! Entry storage combining the key map, LRU order, tag index and expiry
//! index. Every method leaves all four structures mutually consistent, so a
//! single lock around the store is enough to keep observers from seeing a
//! key in the map but missing from its tag buckets, or the reverse.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

use crate::cache::{CacheConfig, CacheEntry, CacheStats, LruTracker, TagIndex};

// == Cache Store ==
/// Single-threaded cache state; wrap in a lock for shared use.
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    lru: LruTracker,
    tags: TagIndex,
    /// `(expires_at, seq) -> key` for entries that carry a TTL
    expiry: BTreeMap<(Instant, u64), String>,
    stats: CacheStats,
    size_bytes: usize,
    config: CacheConfig,
    next_seq: u64,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            tags: TagIndex::new(),
            expiry: BTreeMap::new(),
            stats: CacheStats::new(),
            size_bytes: 0,
            config,
            next_seq: 0,
        }
    }

    // == Get ==
    /// Looks up a live entry, counting a hit or a miss.
    ///
    /// A hit refreshes the entry's recency. An expired entry is removed on
    /// the spot and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<Arc<V>> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired_at(now) {
                self.lru.touch(entry.lru_slot);
                self.stats.record_hit();
                return Some(Arc::clone(&entry.value));
            }

            self.remove_entry(key);
            self.stats.record_expiration();
        }

        self.stats.record_miss();
        None
    }

    // == Peek ==
    /// Returns a live value without touching recency or counters.
    pub fn peek(&self, key: &str) -> Option<Arc<V>> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Records a hit for `key` in place of the miss counted by an earlier
    /// `get`, for a value that a concurrent writer stored in between.
    pub fn convert_miss_to_hit(&mut self, key: &str) {
        if let Some(entry) = self.entries.get(key) {
            self.lru.touch(entry.lru_slot);
        }
        self.stats.misses = self.stats.misses.saturating_sub(1);
        self.stats.record_hit();
    }

    // == Insert ==
    /// Stores `value` under `key`, replacing any previous entry wholesale.
    ///
    /// The old entry leaves every tag bucket before the new one joins its
    /// own buckets. Capacity is enforced afterwards; returns how many other
    /// entries were evicted to make room.
    pub fn insert(
        &mut self,
        key: String,
        value: Arc<V>,
        ttl: Option<Duration>,
        tags: &[String],
        size_bytes: usize,
    ) -> usize {
        self.remove_entry(&key);

        let seq = self.next_seq;
        self.next_seq += 1;

        let tags: BTreeSet<String> = tags.iter().cloned().collect();
        let mut entry = CacheEntry::new(value, ttl, tags, size_bytes, Instant::now(), seq);
        entry.lru_slot = self.lru.push_front(key.clone());
        for tag in &entry.tags {
            self.tags.add(tag, &key);
        }
        if let Some(expiry_key) = entry.expiry_key() {
            self.expiry.insert(expiry_key, key.clone());
        }
        self.size_bytes = self.size_bytes.saturating_add(size_bytes);
        self.entries.insert(key.clone(), entry);

        self.enforce_capacity(&key)
    }

    // == Delete ==
    /// Removes `key`; returns whether a live entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.invalidate_key(key, Instant::now());
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    // == Tag Invalidation ==
    /// Removes every entry carrying `tag`; returns the number of live
    /// entries removed.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> usize {
        let now = Instant::now();
        let keys = self.tags.keys_for_tag(tag);

        let mut removed = 0;
        for key in &keys {
            if self.invalidate_key(key, now) {
                removed += 1;
            }
        }

        self.stats.record_invalidations(removed);
        debug!(tag, removed, "invalidated by tag");
        removed
    }

    // == Pattern Invalidation ==
    /// Removes every entry whose key matches `pattern`.
    ///
    /// Scans all keys; intended for infrequent administrative use.
    pub fn invalidate_matching(&mut self, pattern: &Regex) -> usize {
        let now = Instant::now();
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect();

        let mut removed = 0;
        for key in &keys {
            if self.invalidate_key(key, now) {
                removed += 1;
            }
        }

        self.stats.record_invalidations(removed);
        debug!(pattern = pattern.as_str(), removed, "invalidated by pattern");
        removed
    }

    // == Sweep Expired ==
    /// Removes up to `max` entries whose TTL has passed, oldest deadline
    /// first. Returns the number removed.
    pub fn sweep_expired(&mut self, max: usize) -> usize {
        let now = Instant::now();
        let due: Vec<String> = self
            .expiry
            .range(..=(now, u64::MAX))
            .take(max)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &due {
            self.remove_entry(key);
            self.stats.record_expiration();
        }
        due.len()
    }

    // == Clear ==
    /// Drops every entry and resets the counters; returns the number of
    /// entries dropped.
    pub fn clear(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.tags.clear();
        self.expiry.clear();
        self.size_bytes = 0;
        self.stats = CacheStats::new();
        cleared
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats
            .clone()
            .with_occupancy(self.entries.len(), self.size_bytes)
    }

    /// Snapshot of the keys carrying `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> HashSet<String> {
        self.tags.keys_for_tag(tag)
    }

    /// Tags of a live entry, sorted.
    pub fn tags_of(&self, key: &str) -> Option<Vec<String>> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.tags.iter().cloned().collect())
    }

    /// Time left before a live entry expires; `Some(None)` when it never
    /// expires, `None` when there is no live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.ttl_remaining_at(now))
    }

    /// Snapshot of every stored key.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of entries physically held, including expired ones the sweep
    /// has not reached yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Removes `key`, returning true only if the entry was still live.
    /// Expired entries removed here count as expirations.
    fn invalidate_key(&mut self, key: &str, now: Instant) -> bool {
        match self.remove_entry(key) {
            Some(entry) if entry.is_expired_at(now) => {
                self.stats.record_expiration();
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Unlinks an entry from the map, LRU list, tag index and expiry index.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(entry.lru_slot);
        for tag in &entry.tags {
            self.tags.remove(tag, key);
        }
        if let Some(expiry_key) = entry.expiry_key() {
            self.expiry.remove(&expiry_key);
        }
        self.size_bytes = self.size_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    /// Evicts least recently used entries until capacity is satisfied.
    ///
    /// The entry just written under `protected` is never the victim: an entry
    /// larger than the whole capacity stays until the next write.
    fn enforce_capacity(&mut self, protected: &str) -> usize {
        let mut evicted = 0;

        while self.config.is_over_capacity(self.entries.len(), self.size_bytes) {
            let victim = match self.lru.peek_oldest() {
                Some(oldest) if oldest != protected => oldest.to_string(),
                _ => break,
            };
            if self.remove_entry(&victim).is_some() {
                self.stats.record_eviction();
                evicted += 1;
                debug!(key = %victim, "evicted least recently used entry");
            }
        }

        evicted
    }

    /// Verifies that the map, LRU list, tag index and expiry index agree.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.lru.len() != self.entries.len() {
            return Err(format!(
                "lru tracks {} keys but store holds {}",
                self.lru.len(),
                self.entries.len()
            ));
        }

        let mut bytes = 0usize;
        let mut with_ttl = 0usize;
        for (key, entry) in &self.entries {
            bytes += entry.size_bytes;
            for tag in &entry.tags {
                if !self.tags.contains(tag, key) {
                    return Err(format!("key '{key}' missing from tag bucket '{tag}'"));
                }
            }
            if let Some(expiry_key) = entry.expiry_key() {
                with_ttl += 1;
                if self.expiry.get(&expiry_key) != Some(key) {
                    return Err(format!("key '{key}' missing from expiry index"));
                }
            }
        }

        for (tag, keys) in self.tags.iter() {
            if keys.is_empty() {
                return Err(format!("empty bucket retained for tag '{tag}'"));
            }
            for key in keys {
                match self.entries.get(key) {
                    Some(entry) if entry.tags.contains(tag) => {}
                    _ => return Err(format!("tag '{tag}' lists stale key '{key}'")),
                }
            }
        }

        if with_ttl != self.expiry.len() {
            return Err("expiry index holds stale keys".to_string());
        }
        if bytes != self.size_bytes {
            return Err(format!(
                "tracked size {} differs from actual {}",
                self.size_bytes, bytes
            ));
        }
        Ok(())
    }
}
