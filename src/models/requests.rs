//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Request body for POST /invalidate_tag
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateTagRequest {
    pub tag: String,
}

impl InvalidateTagRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.tag.trim().is_empty() {
            return Some("Tag cannot be empty".to_string());
        }
        None
    }
}

/// Request body for POST /invalidate_pattern
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidatePatternRequest {
    /// Regular expression matched against cache keys
    pub pattern: String,
}

impl InvalidatePatternRequest {
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

/// Request body for POST /warm
#[derive(Debug, Clone, Deserialize)]
pub struct WarmRequest {
    pub entries: Vec<WarmEntryRequest>,
}

/// One key to warm through a registered warmer.
///
/// # Fields
/// - `key`: Cache key to populate
/// - `warmer`: Name of a warmer registered by the host
/// - `params`: Arguments handed to the warmer
/// - `ttl_ms`: Optional TTL in milliseconds (absent or 0 = no expiration)
/// - `tags`: Invalidation tags for the entry
/// - `force`: Recompute even when the key is present
#[derive(Debug, Clone, Deserialize)]
pub struct WarmEntryRequest {
    pub key: String,
    pub warmer: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub force: bool,
}

impl WarmRequest {
    pub fn validate(&self) -> Option<String> {
        if self.entries.is_empty() {
            return Some("Warm request must contain at least one entry".to_string());
        }
        for entry in &self.entries {
            if entry.key.is_empty() {
                return Some("Warm entry key cannot be empty".to_string());
            }
            if entry.warmer.is_empty() {
                return Some(format!("Warm entry '{}' names no warmer", entry.key));
            }
        }
        None
    }
}
