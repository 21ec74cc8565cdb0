//! Cache Key Derivation
//!
//! Builds cache keys from query parameters so that equivalent queries share
//! one entry regardless of parameter order or empty filters.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write;
use std::hash::{Hash, Hasher};

use serde_json::Value;

/// Derives `"{namespace}:{hash}"` from query parameters.
///
/// Object keys are sorted, strings are trimmed, and `null`, empty strings,
/// empty arrays and empty objects are dropped before hashing. Array order is
/// kept. The namespace stays readable so related keys can be removed with a
/// pattern such as `^namespace:`.
pub fn query_key(namespace: &str, params: &Value) -> String {
    format!("{}:{:016x}", namespace, params_hash(params))
}

/// Derives `"{namespace}:{scope}:{hash}"`, keeping results computed for one
/// caller apart from everyone else's.
///
/// A `None` scope yields the same key as [`query_key`]. Scoped keys can be
/// dropped together with a pattern such as `^namespace:scope:`. To bypass
/// a cached value for one call, use [`QueryCache::refresh`].
///
/// [`QueryCache::refresh`]: crate::cache::QueryCache::refresh
pub fn scoped_query_key(namespace: &str, scope: Option<&str>, params: &Value) -> String {
    match scope {
        Some(scope) => format!("{}:{}:{:016x}", namespace, scope, params_hash(params)),
        None => query_key(namespace, params),
    }
}

fn params_hash(params: &Value) -> u64 {
    let mut canonical = String::new();
    if let Some(value) = normalize(params) {
        render(&value, &mut canonical);
    }

    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish()
}

/// Drops empty values recursively; `None` means "absent".
fn normalize(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.iter().filter_map(normalize).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(fields) => {
            let fields: serde_json::Map<String, Value> = fields
                .iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k.clone(), v)))
                .collect();
            (!fields.is_empty()).then_some(Value::Object(fields))
        }
        other => Some(other.clone()),
    }
}

/// Renders JSON with object keys in sorted order.
fn render(value: &Value, out: &mut String) {
    match value {
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{:?}:", key);
                render(&fields[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
