//! Cache backend and loader traits.
//!
//! This module defines the two seams the dispatcher is generic over: the
//! keyed cache store and the loader that reads the backing store on miss.

use async_trait::async_trait;
use cachet_core::CachetResult;
use serde_json::Value;
use std::collections::HashMap;

use crate::key::CacheKey;

/// Pluggable keyed cache store.
///
/// Implementations must be independently thread-safe; the dispatcher adds no
/// locking of its own around backend calls. A cached value may legitimately
/// be `Value::Null`: `None` from [`CacheBackend::get`] means *absent*,
/// `Some(Value::Null)` means a *cached null* that still satisfies reads.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a cached value.
    async fn get(&self, key: &CacheKey) -> CachetResult<Option<Value>>;

    /// Get many cached values at once. Absent keys are simply missing from
    /// the returned map.
    async fn get_many(&self, keys: &[CacheKey]) -> CachetResult<HashMap<CacheKey, Value>>;

    /// Write a value, overwriting any prior entry for the key.
    async fn put(&self, key: CacheKey, value: Value) -> CachetResult<()>;

    /// Write many entries; existing entries for the same keys are overwritten.
    async fn put_many(&self, entries: Vec<(CacheKey, Value)>) -> CachetResult<()>;

    /// Remove the entry for a key. An absent key is a no-op.
    async fn evict(&self, key: &CacheKey) -> CachetResult<()>;

    /// Remove the entries for many keys. Absent keys are no-ops.
    async fn evict_many(&self, keys: &[CacheKey]) -> CachetResult<()>;

    /// Remove every entry in this logical cache region.
    async fn clear(&self) -> CachetResult<()>;

    /// Get cache statistics.
    async fn stats(&self) -> CachetResult<CacheStats>;
}

/// Caller-supplied loader mapping keys to values from the backing store.
///
/// Invoked only on cache miss; reads, never writes, the store. Concurrent
/// misses on the same key may invoke the loader more than once - there is no
/// single-flight collapsing.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load the value for one key. Returns `Value::Null` when the key has no
    /// backing record; the dispatcher caches that null.
    async fn load(&self, key: &Value) -> CachetResult<Value>;

    /// Load values for many keys in one call. Keys with no backing record
    /// are omitted from the result, not represented by a placeholder.
    async fn load_many(&self, keys: &[Value]) -> CachetResult<Vec<(Value, Value)>>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of entries dropped to make room at capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
