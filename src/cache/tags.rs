//! Tag Index Module
//!
//! Inverted index from tag to the keys carrying it, so tag invalidation
//! touches only the affected keys instead of scanning the store.

use std::collections::{HashMap, HashSet};

// == Tag Index ==
/// Reverse mapping `tag -> keys`.
///
/// Empty buckets are dropped as soon as their last key leaves, so one-shot
/// tags do not accumulate.
#[derive(Debug, Default)]
pub struct TagIndex {
    buckets: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Add ==
    pub fn add(&mut self, tag: &str, key: &str) {
        match self.buckets.get_mut(tag) {
            Some(keys) => {
                keys.insert(key.to_string());
            }
            None => {
                self.buckets
                    .insert(tag.to_string(), HashSet::from([key.to_string()]));
            }
        }
    }

    // == Remove ==
    /// Unlinks `key` from `tag`, dropping the bucket when it becomes empty.
    pub fn remove(&mut self, tag: &str, key: &str) {
        if let Some(keys) = self.buckets.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                self.buckets.remove(tag);
            }
        }
    }

    // == Keys For Tag ==
    /// Snapshot of the keys currently carrying `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> HashSet<String> {
        self.buckets.get(tag).cloned().unwrap_or_default()
    }

    pub fn contains(&self, tag: &str, key: &str) -> bool {
        self.buckets
            .get(tag)
            .is_some_and(|keys| keys.contains(key))
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> + '_ {
        self.buckets.iter().map(|(tag, keys)| (tag.as_str(), keys))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
