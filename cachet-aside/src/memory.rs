//! In-memory cache backend.

use async_trait::async_trait;
use cachet_core::{CacheError, CachetResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::key::CacheKey;
use crate::traits::{CacheBackend, CacheStats};

/// Configuration for a cache region.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name of the logical cache region, used in log events.
    pub name: String,
    /// Maximum number of entries held at once.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "cachet".to_string(),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Create a config for the named cache region with default limits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the maximum number of entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}

/// In-memory [`CacheBackend`] over a hash table.
///
/// Thread-safe via an interior read-write lock. When the table is at
/// capacity, inserting a new key drops an arbitrary existing entry and
/// counts an eviction - this backend models a bounded table, not a
/// replacement policy.
#[derive(Debug, Default)]
pub struct MemoryCache {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, Value>>,
    stats: RwLock<CacheStats>,
}

impl MemoryCache {
    /// Create an empty cache region.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// The region configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert one entry with the write lock already held.
    fn insert_entry(
        &self,
        entries: &mut HashMap<CacheKey, Value>,
        stats: &mut CacheStats,
        key: CacheKey,
        value: Value,
    ) {
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
                stats.evictions += 1;
                debug!(cache = %self.config.name, key = %victim, "entry evicted at capacity");
            }
        }
        entries.insert(key, value);
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> CachetResult<Option<Value>> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        match entries.get(key) {
            Some(value) => {
                stats.hits += 1;
                Ok(Some(value.clone()))
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn get_many(&self, keys: &[CacheKey]) -> CachetResult<HashMap<CacheKey, Value>> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            match entries.get(key) {
                Some(value) => {
                    stats.hits += 1;
                    found.insert(key.clone(), value.clone());
                }
                None => stats.misses += 1,
            }
        }
        Ok(found)
    }

    async fn put(&self, key: CacheKey, value: Value) -> CachetResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        self.insert_entry(&mut entries, &mut stats, key, value);
        Ok(())
    }

    async fn put_many(&self, batch: Vec<(CacheKey, Value)>) -> CachetResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let mut stats = self.stats.write().map_err(|_| CacheError::LockPoisoned)?;
        for (key, value) in batch {
            self.insert_entry(&mut entries, &mut stats, key, value);
        }
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> CachetResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn evict_many(&self, keys: &[CacheKey]) -> CachetResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> CachetResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.clear();
        debug!(cache = %self.config.name, "cache cleared");
        Ok(())
    }

    async fn stats(&self) -> CachetResult<CacheStats> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        let mut stats = self
            .stats
            .read()
            .map_err(|_| CacheError::LockPoisoned)?
            .clone();
        stats.entry_count = entries.len() as u64;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(value: i64) -> CacheKey {
        CacheKey::from_value(&json!(value)).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_evict_cycle() {
        let cache = MemoryCache::new(CacheConfig::new("records"));

        cache.put(key(1), json!({"id": 1})).await.unwrap();
        assert_eq!(cache.get(&key(1)).await.unwrap(), Some(json!({"id": 1})));

        cache.evict(&key(1)).await.unwrap();
        assert_eq!(cache.get(&key(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cached_null_is_distinct_from_absent() {
        let cache = MemoryCache::new(CacheConfig::new("records"));

        cache.put(key(1), Value::Null).await.unwrap();
        assert_eq!(cache.get(&key(1)).await.unwrap(), Some(Value::Null));
        assert_eq!(cache.get(&key(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let cache = MemoryCache::new(CacheConfig::new("records"));

        cache.put(key(1), json!("old")).await.unwrap();
        cache.put(key(1), json!("new")).await.unwrap();
        assert_eq!(cache.get(&key(1)).await.unwrap(), Some(json!("new")));
    }

    #[tokio::test]
    async fn test_get_many_returns_present_keys_only() {
        let cache = MemoryCache::new(CacheConfig::new("records"));
        cache.put(key(1), json!("a")).await.unwrap();
        cache.put(key(2), json!("b")).await.unwrap();

        let found = cache
            .get_many(&[key(1), key(2), key(3)])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get(&key(3)), None);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_the_region() {
        let cache = MemoryCache::new(CacheConfig::new("records"));
        cache.put(key(1), json!("a")).await.unwrap();
        cache.put(key(2), json!("b")).await.unwrap();

        cache.clear().await.unwrap();
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_capacity_drops_an_entry_and_counts_eviction() {
        let cache = MemoryCache::new(CacheConfig::new("tiny").with_max_entries(2));
        cache.put(key(1), json!("a")).await.unwrap();
        cache.put(key(2), json!("b")).await.unwrap();
        cache.put(key(3), json!("c")).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.evictions, 1);
        // The newly-written key always lands.
        assert_eq!(cache.get(&key(3)).await.unwrap(), Some(json!("c")));
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = MemoryCache::new(CacheConfig::new("tiny").with_max_entries(2));
        cache.put(key(1), json!("a")).await.unwrap();
        cache.put(key(2), json!("b")).await.unwrap();
        cache.put(key(1), json!("a2")).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.evictions, 0);
    }
}
