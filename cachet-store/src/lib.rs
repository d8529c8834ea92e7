//! Cachet Store - Simulated Database
//!
//! A keyed record table standing in for a database: monotonic identifier
//! assignment, a uniqueness constraint on record names, and a coarse
//! reader-writer lock over the whole table. Callers always receive isolated
//! copies, never aliases into the table.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use cachet_core::{CachetResult, Draft, Record, RecordId, StoreError, FIRST_RECORD_ID};
use tracing::debug;

// ============================================================================
// TABLE STATE
// ============================================================================

/// Everything the lock protects: row map and identifier counter together,
/// so identifier assignment and row insertion are one critical section.
#[derive(Debug)]
struct TableInner {
    rows: HashMap<RecordId, Record>,
    next_id: RecordId,
}

impl Default for TableInner {
    fn default() -> Self {
        Self::new()
    }
}

impl TableInner {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
            next_id: FIRST_RECORD_ID,
        }
    }

    /// Uniqueness check, linear over the table like a missing index would be.
    fn name_taken(&self, name: &str, excluding: Option<RecordId>) -> bool {
        self.rows
            .values()
            .any(|row| Some(row.id) != excluding && row.name == name)
    }

    /// Replace a row in place. Shared by `update` and `batch_update` so the
    /// uniqueness check and the mutation stay under the caller's write lock.
    fn update_row(&mut self, record: Record) -> Result<Record, StoreError> {
        let old = self
            .rows
            .get(&record.id)
            .ok_or(StoreError::NotFound { id: record.id })?;

        if old.name != record.name && self.name_taken(&record.name, Some(record.id)) {
            return Err(StoreError::DuplicateName {
                name: record.name.clone(),
            });
        }

        self.rows.insert(record.id, record.clone());
        Ok(record)
    }
}

// ============================================================================
// RECORD STORE
// ============================================================================

/// The simulated database table.
///
/// Reads (`find`, `find_many`) take the lock in read mode and do not block
/// one another. Mutations take it in write mode; batch operations hold the
/// write lock for the whole batch, so outside readers never observe a
/// partially-applied batch.
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<TableInner>,
}

impl RecordStore {
    /// Create an empty store. The first issued identifier is 1.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner::new()),
        }
    }

    /// Look up a record by id, returning an isolated copy.
    pub fn find(&self, id: RecordId) -> CachetResult<Option<Record>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.rows.get(&id).cloned())
    }

    /// Look up many records at once. Ids with no record are silently omitted.
    pub fn find_many(&self, ids: &BTreeSet<RecordId>) -> CachetResult<BTreeMap<RecordId, Record>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.rows.get(id).map(|row| (*id, row.clone())))
            .collect())
    }

    /// Number of active records.
    pub fn len(&self) -> CachetResult<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.rows.len())
    }

    /// True when the table holds no records.
    pub fn is_empty(&self) -> CachetResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Insert a new record, assigning the next identifier.
    ///
    /// Fails with [`StoreError::DuplicateName`] if the draft's name already
    /// belongs to an active record. The uniqueness check and the insertion
    /// happen under the same write-lock acquisition, so two concurrent saves
    /// of one name cannot both pass the check.
    pub fn save(&self, draft: Draft) -> CachetResult<Record> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        if inner.name_taken(&draft.name, None) {
            return Err(StoreError::DuplicateName { name: draft.name }.into());
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let record = draft.into_record(id);
        inner.rows.insert(id, record.clone());
        debug!(id, name = %record.name, "record saved");
        Ok(record)
    }

    /// Replace an existing record.
    ///
    /// Fails with [`StoreError::NotFound`] if the id has no active record,
    /// and with [`StoreError::DuplicateName`] if the name changed and now
    /// collides with another record.
    pub fn update(&self, record: Record) -> CachetResult<Record> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let updated = inner.update_row(record)?;
        debug!(id = updated.id, "record updated");
        Ok(updated)
    }

    /// Update records in order under one write-lock acquisition.
    ///
    /// A failure on any element aborts the remaining elements but does not
    /// roll back updates already applied within the batch.
    pub fn batch_update(&self, records: &[Record]) -> CachetResult<BTreeMap<RecordId, Record>> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        let mut applied = BTreeMap::new();
        for record in records {
            let updated = inner.update_row(record.clone())?;
            applied.insert(updated.id, updated);
        }
        debug!(count = applied.len(), "batch update applied");
        Ok(applied)
    }

    /// Remove a record. An absent id is a no-op, not an error.
    pub fn delete(&self, id: RecordId) -> CachetResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.rows.remove(&id);
        debug!(id, "record deleted");
        Ok(())
    }

    /// Remove many records under one write-lock acquisition. Absent ids are
    /// no-ops.
    pub fn batch_delete(&self, ids: &BTreeSet<RecordId>) -> CachetResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        for id in ids {
            inner.rows.remove(id);
        }
        debug!(count = ids.len(), "batch delete applied");
        Ok(())
    }

    /// Remove all records and reset the identifier counter to its initial
    /// value, so the next `save` is issued id 1 again.
    pub fn clear(&self) -> CachetResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.rows.clear();
        inner.next_id = FIRST_RECORD_ID;
        debug!("store cleared");
        Ok(())
    }
}
