//! Cachet Core - Record Types
//!
//! Pure data structures with no behavior beyond constructors and accessors.
//! All other crates depend on this. This crate contains ONLY data types and
//! error enums - no caching or storage logic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod error;

pub use error::{
    CacheError, CachetError, CachetResult, DispatchError, ExprError, StoreError,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Record identifier issued by the store.
///
/// Identifiers are strictly increasing, starting at 1. They are never reused
/// until the store is cleared, which resets the counter.
pub type RecordId = u64;

/// The identifier the store hands out first, and again after every clear.
pub const FIRST_RECORD_ID: RecordId = 1;

// ============================================================================
// RECORDS
// ============================================================================

/// A stored record: a unique identifier, a uniquely-constrained name, and an
/// open attribute map for everything else.
///
/// The attribute map is flattened on (de)serialization, so a record with an
/// `age` attribute reads as `{"id":1,"name":"Jack0","age":18}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-issued identifier.
    pub id: RecordId,
    /// Uniquely-constrained name.
    pub name: String,
    /// Arbitrary payload fields.
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl Record {
    /// Create a record with an empty attribute map.
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attrs: Map::new(),
        }
    }

    /// Look up a payload attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Set a payload attribute, replacing any previous value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.attrs.insert(key.into(), value);
        self
    }
}

/// A record candidate without an identity, consumed by `save`.
///
/// Keeping the unsaved shape as its own type means a "record without an id"
/// is unrepresentable as a stored [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Uniquely-constrained name.
    pub name: String,
    /// Arbitrary payload fields, flattened like [`Record::attrs`].
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl Draft {
    /// Create a draft with an empty attribute map.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Map::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Turn this draft into a record under the given identifier.
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            name: self.name,
            attrs: self.attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_attrs_flatten_on_serialization() {
        let mut record = Record::new(1, "Jack0");
        record.set_attr("age", json!(18));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": 1, "name": "Jack0", "age": 18}));

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_draft_into_record() {
        let draft = Draft::new("Jack1").with_attr("age", json!(20));
        let record = draft.into_record(7);

        assert_eq!(record.id, 7);
        assert_eq!(record.name, "Jack1");
        assert_eq!(record.attr("age"), Some(&json!(20)));
    }

    #[test]
    fn test_draft_has_no_id_field() {
        let draft = Draft::new("Jack2");
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value, json!({"name": "Jack2"}));
    }
}
