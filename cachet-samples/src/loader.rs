//! Loader bridging cache misses to the record store.

use async_trait::async_trait;
use cachet_aside::Loader;
use cachet_core::{CacheError, CachetResult, RecordId};
use cachet_store::RecordStore;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// [`Loader`] implementation that reads, and only reads, the
/// [`RecordStore`].
pub struct StoreLoader {
    store: Arc<RecordStore>,
}

impl StoreLoader {
    /// Wrap a store handle.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    fn record_id(key: &Value) -> CachetResult<RecordId> {
        key.as_u64().ok_or_else(|| {
            CacheError::Codec {
                reason: format!("record key must be an unsigned integer, got {}", key),
            }
            .into()
        })
    }

    fn to_value(record: &cachet_core::Record) -> CachetResult<Value> {
        serde_json::to_value(record).map_err(|e| {
            CacheError::Codec {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl Loader for StoreLoader {
    async fn load(&self, key: &Value) -> CachetResult<Value> {
        let id = Self::record_id(key)?;
        match self.store.find(id)? {
            Some(record) => Self::to_value(&record),
            None => Ok(Value::Null),
        }
    }

    async fn load_many(&self, keys: &[Value]) -> CachetResult<Vec<(Value, Value)>> {
        let ids = keys
            .iter()
            .map(Self::record_id)
            .collect::<CachetResult<BTreeSet<RecordId>>>()?;
        let found = self.store.find_many(&ids)?;

        let mut pairs = Vec::with_capacity(found.len());
        for key in keys {
            let id = Self::record_id(key)?;
            if let Some(record) = found.get(&id) {
                pairs.push((key.clone(), Self::to_value(record)?));
            }
        }
        Ok(pairs)
    }
}
