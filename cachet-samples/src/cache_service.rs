//! The cache-backed record service.
//!
//! One binding per method, registered once at construction; every call goes
//! through the dispatcher. Reads are satisfied from the cache with the
//! [`StoreLoader`] filling misses; writes run against the [`RecordStore`]
//! first and reflect into the cache only on success.

use crate::loader::StoreLoader;
use cachet_aside::{
    Binding, BindingRegistry, CacheBackend, CacheConfig, CacheDispatcher, CacheStats, Declared,
    MemoryCache, MethodCall, WrapperKind,
};
use cachet_core::{CacheError, CachetError, CachetResult, Draft, Record, RecordId};
use cachet_expr::PathExpr;
use cachet_store::RecordStore;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Cache-aside record service.
///
/// The method set mirrors the plain store API; the wrapper variants
/// (`get_optional`, `get_future`, `get_reactive`) read the same cached raw
/// value through different declared return shapes.
pub struct RecordCacheService {
    store: Arc<RecordStore>,
    dispatcher: CacheDispatcher<MemoryCache, StoreLoader>,
}

impl RecordCacheService {
    /// Wire a store, a fresh in-memory cache region, and the binding table.
    pub fn new(store: Arc<RecordStore>, config: CacheConfig) -> CachetResult<Self> {
        let registry = BindingRegistry::builder()
            .register(Binding::cacheable("get"))
            .register(Binding::cacheable("get_optional").with_wrapper(WrapperKind::Optional))
            .register(Binding::cacheable("get_future").with_wrapper(WrapperKind::Future))
            .register(Binding::cacheable("get_reactive").with_wrapper(WrapperKind::ReactiveSingle))
            .register(Binding::cacheable_all("get_many"))
            .register(Binding::put("save").with_key(PathExpr::parse("#result.id")?))
            .register(
                Binding::put("update")
                    .with_key(PathExpr::parse("#record.id")?)
                    .with_value(PathExpr::parse("#record")?),
            )
            .register(Binding::put_all("update_many"))
            .register(Binding::evict("remove"))
            .register(Binding::evict_all("remove_many"))
            .register(Binding::clear("clear"))
            .build();

        let cache = Arc::new(MemoryCache::new(config));
        let loader = Arc::new(StoreLoader::new(Arc::clone(&store)));
        Ok(Self {
            store,
            dispatcher: CacheDispatcher::new(cache, loader, registry),
        })
    }

    /// The backing store handle.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Statistics for the cache region behind this service.
    pub async fn cache_stats(&self) -> CachetResult<CacheStats> {
        self.dispatcher.backend().stats().await
    }

    /// Read one record through the cache.
    pub async fn get(&self, id: RecordId) -> CachetResult<Option<Record>> {
        let declared = self
            .dispatcher
            .dispatch("get", MethodCall::new().arg("id", Value::from(id)))
            .await?;
        Self::decode(declared.into_raw().await)
    }

    /// Read one record through the cache, declared as an optional.
    pub async fn get_optional(&self, id: RecordId) -> CachetResult<Option<Record>> {
        let declared = self
            .dispatcher
            .dispatch("get_optional", MethodCall::new().arg("id", Value::from(id)))
            .await?;
        match declared {
            Declared::Optional(raw) => Self::decode(raw.unwrap_or(Value::Null)),
            other => Self::decode(other.into_raw().await),
        }
    }

    /// Read one record through the cache, declared as a completed future.
    pub async fn get_future(&self, id: RecordId) -> CachetResult<Option<Record>> {
        let declared = self
            .dispatcher
            .dispatch("get_future", MethodCall::new().arg("id", Value::from(id)))
            .await?;
        match declared {
            Declared::Future(fut) => Self::decode(fut.await),
            other => Self::decode(other.into_raw().await),
        }
    }

    /// Read one record through the cache, declared as a single-element stream.
    pub async fn get_reactive(&self, id: RecordId) -> CachetResult<Option<Record>> {
        let declared = self
            .dispatcher
            .dispatch("get_reactive", MethodCall::new().arg("id", Value::from(id)))
            .await?;
        match declared {
            Declared::ReactiveSingle(mut stream) => {
                Self::decode(stream.next().await.unwrap_or(Value::Null))
            }
            other => Self::decode(other.into_raw().await),
        }
    }

    /// Read many records at once. Ids found in neither the cache nor the
    /// store are omitted from the result.
    pub async fn get_many(
        &self,
        ids: &BTreeSet<RecordId>,
    ) -> CachetResult<BTreeMap<RecordId, Record>> {
        let keys: Vec<Value> = ids.iter().map(|id| Value::from(*id)).collect();
        let declared = self
            .dispatcher
            .dispatch("get_many", MethodCall::new().arg("ids", Value::Array(keys)))
            .await?;
        Self::decode_map(declared.into_raw().await)
    }

    /// Save a new record, writing the saved row through to the cache under
    /// its freshly assigned id.
    pub async fn save(&self, draft: Draft) -> CachetResult<Record> {
        let arg = Self::encode(&draft)?;
        let store = Arc::clone(&self.store);
        let declared = self
            .dispatcher
            .dispatch(
                "save",
                MethodCall::new().arg("draft", arg).body(async move {
                    let record = store.save(draft)?;
                    Ok(Declared::plain(Self::encode(&record)?))
                }),
            )
            .await?;
        Self::record(declared.into_raw().await)
    }

    /// Update an existing record, writing the new row through to the cache.
    pub async fn update(&self, record: Record) -> CachetResult<Record> {
        let arg = Self::encode(&record)?;
        let store = Arc::clone(&self.store);
        let declared = self
            .dispatcher
            .dispatch(
                "update",
                MethodCall::new().arg("record", arg).body(async move {
                    let updated = store.update(record)?;
                    Ok(Declared::plain(Self::encode(&updated)?))
                }),
            )
            .await?;
        Self::record(declared.into_raw().await)
    }

    /// Update records in order. A mid-batch failure propagates and leaves
    /// the cache exactly as it was, even for the store rows already updated.
    pub async fn update_many(
        &self,
        records: Vec<Record>,
    ) -> CachetResult<BTreeMap<RecordId, Record>> {
        let store = Arc::clone(&self.store);
        let declared = self
            .dispatcher
            .dispatch(
                "update_many",
                MethodCall::new().body(async move {
                    let updated = store.batch_update(&records)?;
                    Ok(Declared::plain(Self::encode(&updated)?))
                }),
            )
            .await?;
        Self::decode_map(declared.into_raw().await)
    }

    /// Delete one record and evict its cache entry.
    pub async fn remove(&self, id: RecordId) -> CachetResult<()> {
        let store = Arc::clone(&self.store);
        self.dispatcher
            .dispatch(
                "remove",
                MethodCall::new().arg("id", Value::from(id)).body(async move {
                    store.delete(id)?;
                    Ok(Declared::plain(Value::Null))
                }),
            )
            .await?;
        Ok(())
    }

    /// Delete many records and evict their cache entries.
    pub async fn remove_many(&self, ids: &BTreeSet<RecordId>) -> CachetResult<()> {
        let keys: Vec<Value> = ids.iter().map(|id| Value::from(*id)).collect();
        let store = Arc::clone(&self.store);
        let ids = ids.clone();
        self.dispatcher
            .dispatch(
                "remove_many",
                MethodCall::new()
                    .arg("ids", Value::Array(keys))
                    .body(async move {
                        store.batch_delete(&ids)?;
                        Ok(Declared::plain(Value::Null))
                    }),
            )
            .await?;
        Ok(())
    }

    /// Drop every record and every cache entry, resetting the id counter.
    pub async fn clear(&self) -> CachetResult<()> {
        let store = Arc::clone(&self.store);
        self.dispatcher
            .dispatch(
                "clear",
                MethodCall::new().body(async move {
                    store.clear()?;
                    Ok(Declared::plain(Value::Null))
                }),
            )
            .await?;
        Ok(())
    }

    fn encode<T: Serialize>(value: &T) -> CachetResult<Value> {
        serde_json::to_value(value).map_err(Self::codec)
    }

    fn record(raw: Value) -> CachetResult<Record> {
        serde_json::from_value(raw).map_err(Self::codec)
    }

    /// A raw null means the key had no backing record.
    fn decode(raw: Value) -> CachetResult<Option<Record>> {
        if raw.is_null() {
            Ok(None)
        } else {
            serde_json::from_value(raw).map(Some).map_err(Self::codec)
        }
    }

    fn decode_map(raw: Value) -> CachetResult<BTreeMap<RecordId, Record>> {
        let pairs = match raw {
            Value::Object(pairs) => pairs,
            other => {
                return Err(CacheError::Backend {
                    reason: format!("expected a key-value object, got {}", other),
                }
                .into())
            }
        };

        let mut found = BTreeMap::new();
        for (key, value) in pairs {
            // A null cached by an earlier single read marks the id as known
            // absent; batch results omit it rather than carry a placeholder.
            if value.is_null() {
                continue;
            }
            let id = key.parse::<RecordId>().map_err(|_| CacheError::Codec {
                reason: format!("record key must be an unsigned integer, got {}", key),
            })?;
            found.insert(id, Self::record(value)?);
        }
        Ok(found)
    }

    fn codec(e: serde_json::Error) -> CachetError {
        CacheError::Codec {
            reason: e.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> RecordCacheService {
        let store = Arc::new(RecordStore::new());
        RecordCacheService::new(store, CacheConfig::new("records")).unwrap()
    }

    fn draft(name: &str, age: i64) -> Draft {
        Draft::new(name).with_attr("age", json!(age))
    }

    #[tokio::test]
    async fn test_save_then_get_hits_cache() {
        let svc = service();
        let saved = svc.save(draft("Jack0", 18)).await.unwrap();
        assert_eq!(saved.id, 1);

        let found = svc.get(saved.id).await.unwrap().unwrap();
        assert_eq!(found, saved);

        // The save wrote through, so the read never missed.
        let stats = svc.cache_stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn test_get_absent_id_caches_the_null() {
        let svc = service();
        assert_eq!(svc.get(42).await.unwrap(), None);
        assert_eq!(svc.get(42).await.unwrap(), None);

        // Second read was satisfied by the cached null.
        let stats = svc.cache_stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_wrapper_variants_read_the_same_value() {
        let svc = service();
        let saved = svc.save(draft("Jack1", 18)).await.unwrap();

        assert_eq!(svc.get_optional(saved.id).await.unwrap().unwrap(), saved);
        assert_eq!(svc.get_future(saved.id).await.unwrap().unwrap(), saved);
        assert_eq!(svc.get_reactive(saved.id).await.unwrap().unwrap(), saved);

        // Absent ids unwrap to None for every shape.
        assert_eq!(svc.get_optional(99).await.unwrap(), None);
        assert_eq!(svc.get_future(99).await.unwrap(), None);
        assert_eq!(svc.get_reactive(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_refreshes_cache_entry() {
        let svc = service();
        let mut record = svc.save(draft("Jack2", 18)).await.unwrap();

        record.set_attr("age", json!(20));
        svc.update(record.clone()).await.unwrap();

        let found = svc.get(record.id).await.unwrap().unwrap();
        assert_eq!(found.attr("age"), Some(&json!(20)));
    }

    #[tokio::test]
    async fn test_remove_deletes_row_and_entry() {
        let svc = service();
        let saved = svc.save(draft("Jack3", 18)).await.unwrap();

        svc.remove(saved.id).await.unwrap();
        assert_eq!(svc.get(saved.id).await.unwrap(), None);
        assert_eq!(svc.store().find(saved.id).unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_many_merges_cache_and_store() {
        let svc = service();
        svc.save(draft("Jack4", 18)).await.unwrap();
        svc.save(draft("Jack5", 18)).await.unwrap();

        let ids: BTreeSet<RecordId> = [1, 2, 9].into_iter().collect();
        let found = svc.get_many(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&1].name, "Jack4");
        assert!(!found.contains_key(&9));
    }

    #[tokio::test]
    async fn test_get_many_omits_known_absent_ids() {
        let svc = service();
        svc.save(draft("Jack6", 18)).await.unwrap();

        // Cache a null for id 7 through a single read first.
        assert_eq!(svc.get(7).await.unwrap(), None);

        let ids: BTreeSet<RecordId> = [1, 7].into_iter().collect();
        let found = svc.get_many(&ids).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&1));
    }
}
