//! Validating front service.
//!
//! Sits where an HTTP edge would: checks arguments before touching the cache
//! service and folds every outcome into a [`Response`] envelope instead of
//! letting errors escape.

use cachet_core::{CachetError, Draft, Record, RecordId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

use crate::cache_service::RecordCacheService;
use crate::response::Response;

/// Front service over the cache-backed record service.
pub struct RecordService {
    cache_service: Arc<RecordCacheService>,
}

impl RecordService {
    /// Wrap a cache service handle.
    pub fn new(cache_service: Arc<RecordCacheService>) -> Self {
        Self { cache_service }
    }

    /// Fetch one record. An absent id yields an ok response with no payload.
    pub async fn get(&self, id: RecordId) -> Response<Record> {
        match self.cache_service.get(id).await {
            Ok(Some(record)) => Response::ok(record),
            Ok(None) => Response::ok_empty(),
            Err(e) => Self::fold("get", e),
        }
    }

    /// Fetch many records. Absent ids are omitted from the payload.
    pub async fn get_many(&self, ids: &BTreeSet<RecordId>) -> Response<BTreeMap<RecordId, Record>> {
        if ids.is_empty() {
            return Response::error("ids is empty");
        }
        match self.cache_service.get_many(ids).await {
            Ok(found) => Response::ok(found),
            Err(e) => Self::fold("get_many", e),
        }
    }

    /// Create a record from a draft.
    pub async fn add(&self, mut draft: Draft) -> Response<Record> {
        let Some(name) = normalize_name(&draft.name) else {
            return Response::error("name is blank");
        };
        draft.name = name;
        match self.cache_service.save(draft).await {
            Ok(record) => Response::ok(record),
            Err(e) => Self::fold("add", e),
        }
    }

    /// Replace an existing record.
    pub async fn update(&self, mut record: Record) -> Response<Record> {
        if let Some(msg) = validate_existing(&mut record) {
            return Response::error(msg);
        }
        match self.cache_service.update(record).await {
            Ok(updated) => Response::ok(updated),
            Err(e) => Self::fold("update", e),
        }
    }

    /// Replace many records in order.
    pub async fn update_many(
        &self,
        mut records: Vec<Record>,
    ) -> Response<BTreeMap<RecordId, Record>> {
        if records.is_empty() {
            return Response::error("records is empty");
        }
        for record in &mut records {
            if let Some(msg) = validate_existing(record) {
                return Response::error(msg);
            }
        }
        match self.cache_service.update_many(records).await {
            Ok(updated) => Response::ok(updated),
            Err(e) => Self::fold("update_many", e),
        }
    }

    /// Delete one record.
    pub async fn remove(&self, id: RecordId) -> Response<()> {
        match self.cache_service.remove(id).await {
            Ok(()) => Response::ok_empty(),
            Err(e) => Self::fold("remove", e),
        }
    }

    /// Delete many records.
    pub async fn remove_many(&self, ids: &BTreeSet<RecordId>) -> Response<()> {
        if ids.is_empty() {
            return Response::error("ids is empty");
        }
        match self.cache_service.remove_many(ids).await {
            Ok(()) => Response::ok_empty(),
            Err(e) => Self::fold("remove_many", e),
        }
    }

    /// Drop every record and cache entry.
    pub async fn clear(&self) -> Response<()> {
        match self.cache_service.clear().await {
            Ok(()) => Response::ok_empty(),
            Err(e) => Self::fold("clear", e),
        }
    }

    fn fold<T>(op: &str, e: CachetError) -> Response<T> {
        warn!(op, error = %e, "request failed");
        Response::error(e.to_string())
    }
}

/// Trim a name down to its content; blank names have none.
fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Shared checks for update payloads: the record must already carry a
/// store-issued id and a usable name. Normalizes the name in place and
/// returns the rejection message otherwise.
fn validate_existing(record: &mut Record) -> Option<&'static str> {
    if record.id == 0 {
        return Some("record id is missing");
    }
    match normalize_name(&record.name) {
        Some(name) => {
            record.name = name;
            None
        }
        None => Some("name is blank"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_aside::CacheConfig;
    use cachet_store::RecordStore;
    use serde_json::json;

    fn service() -> RecordService {
        let store = Arc::new(RecordStore::new());
        let cache_service =
            Arc::new(RecordCacheService::new(store, CacheConfig::new("records")).unwrap());
        RecordService::new(cache_service)
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() {
        let svc = service();

        let created = svc.add(Draft::new("  Jack0 ")).await;
        assert!(created.is_ok());
        let record = created.into_data().unwrap();
        // Names are trimmed before they reach the store.
        assert_eq!(record.name, "Jack0");

        let fetched = svc.get(record.id).await;
        assert_eq!(fetched.data(), Some(&record));
    }

    #[tokio::test]
    async fn test_get_absent_id_is_ok_with_no_payload() {
        let svc = service();
        let response = svc.get(42).await;
        assert!(response.is_ok());
        assert_eq!(response.data(), None);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let svc = service();
        let response = svc.add(Draft::new("   ")).await;
        assert!(!response.is_ok());
        assert_eq!(response.msg(), "name is blank");
    }

    #[tokio::test]
    async fn test_duplicate_name_folds_into_error_envelope() {
        let svc = service();
        svc.add(Draft::new("Jack0")).await;

        let dup = svc.add(Draft::new("Jack0")).await;
        assert!(!dup.is_ok());
        assert!(dup.msg().contains("Jack0"));
    }

    #[tokio::test]
    async fn test_update_requires_an_id() {
        let svc = service();
        let response = svc.update(Record::new(0, "Jack0")).await;
        assert!(!response.is_ok());
        assert_eq!(response.msg(), "record id is missing");
    }

    #[tokio::test]
    async fn test_empty_batches_are_rejected() {
        let svc = service();
        assert!(!svc.get_many(&BTreeSet::new()).await.is_ok());
        assert!(!svc.remove_many(&BTreeSet::new()).await.is_ok());
        assert!(!svc.update_many(Vec::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_many_validates_every_record() {
        let svc = service();
        let created = svc.add(Draft::new("Jack1")).await.into_data().unwrap();

        let mut blank = created.clone();
        blank.name = " ".to_string();
        blank.set_attr("age", json!(30));

        let response = svc.update_many(vec![created, blank]).await;
        assert!(!response.is_ok());
        assert_eq!(response.msg(), "name is blank");
    }
}
