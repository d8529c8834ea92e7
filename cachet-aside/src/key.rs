//! Canonical cache keys.

use cachet_core::{CacheError, CachetResult};
use serde_json::Value;
use std::fmt;

/// A cache key in canonical textual form.
///
/// # Design
///
/// Key values arrive as [`Value`]s from the expression resolver. Backends
/// need something hashable and order-stable, so keys canonicalize to text:
/// a string key is its raw content, everything else is its compact JSON
/// text. Numbers therefore read the way a JSON object key would
/// (`1` → `"1"`), which keeps single-key reads and map-shaped batch writes
/// addressing the same entries.
///
/// The private field means a `CacheKey` can only be built through
/// [`CacheKey::from_value`], so every key in a backend went through the same
/// canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    canon: String,
}

impl CacheKey {
    /// Canonicalize a key value.
    pub fn from_value(value: &Value) -> CachetResult<Self> {
        let canon = match value {
            Value::String(text) => text.clone(),
            other => serde_json::to_string(other).map_err(|e| CacheError::Codec {
                reason: e.to_string(),
            })?,
        };
        Ok(Self { canon })
    }

    /// The canonical text of this key.
    pub fn as_str(&self) -> &str {
        &self.canon
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canon)
    }
}
