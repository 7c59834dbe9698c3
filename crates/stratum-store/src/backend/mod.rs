//! Document backend capability set
//!
//! The backing store is an opaque collaborator: it supports
//! insert-with-unique-key, filtered find, and atomic conditional
//! update of a single record. It provides no transactions spanning
//! multiple records and no native versioning; everything above it
//! (optimistic concurrency, history, the change feed) is built from
//! these primitives. Implementations are selected once at process
//! start by configuration and injected at construction time.

pub mod matching;
pub mod memory;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use stratum_core::translate::{StorageFilter, StorageRecord};

use crate::errors::Result;

/// Criteria for an atomic conditional update of one record
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCriteria {
    /// Record id (always required)
    pub id: String,
    /// Required `_modificationCount` value; None disables the check
    pub modification_count: Option<i64>,
    /// Storage-canonical subject URL that must be present in `@graph`;
    /// positional subject updates apply to this element
    pub subject_id: Option<String>,
}

impl UpdateCriteria {
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modification_count: None,
            subject_id: None,
        }
    }
}

/// The typed update vocabulary applied atomically when the criteria
/// match. Fields compose; an empty spec is a no-op.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    /// Amount to add to `_modificationCount`
    pub increment_modification_count: i64,
    /// Top-level record fields to set (metadata touches)
    pub set_fields: StorageRecord,
    /// Fields to set on the `@graph` element matched by
    /// `criteria.subject_id` (escaped predicate name → encoded value)
    pub set_subject_fields: serde_json::Map<String, serde_json::Value>,
    /// Fields to remove from the matched `@graph` element
    pub unset_subject_fields: Vec<String>,
    /// A whole new `@graph` element to append
    pub push_subject: Option<serde_json::Value>,
    /// Storage-canonical subject URLs whose `@graph` elements to remove
    pub pull_subjects: Vec<String>,
    /// History version URL to append to `_history`
    pub push_history: Option<String>,
}

/// Capability set of the backing document store.
///
/// `update_one` is the only atomicity primitive: the check of
/// `criteria` and the application of `update` happen as one
/// linearizable step per record. All operations are keyed by physical
/// collection name; collections spring into existence on first write.
pub trait DocumentBackend: Send + Sync {
    /// Insert a record carrying an `_id` field. Fails with
    /// `DuplicateId` when the id already exists in the collection.
    fn insert(&self, collection: &str, record: StorageRecord) -> Result<()>;

    /// Fetch a record by id
    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<StorageRecord>>;

    /// All records matching a compiled filter, sorted per the filter's
    /// sort specification
    fn find(&self, collection: &str, filter: &StorageFilter) -> Result<Vec<StorageRecord>>;

    /// Atomic conditional update; returns the number of records
    /// matched (0 or 1)
    fn update_one(
        &self,
        collection: &str,
        criteria: &UpdateCriteria,
        update: &UpdateSpec,
    ) -> Result<u64>;

    /// Insert or fully replace the record with the given id
    fn upsert(&self, collection: &str, id: &str, record: StorageRecord) -> Result<()>;

    /// Remove a record; absent ids are a successful no-op. Returns
    /// whether a record was actually removed.
    fn remove(&self, collection: &str, id: &str) -> Result<bool>;

    /// Drop a whole collection; absent collections are a no-op
    fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Ids of every record in a collection
    fn list_ids(&self, collection: &str) -> Result<Vec<String>>;

    /// Names of every non-empty collection
    fn collection_names(&self) -> Result<Vec<String>>;

    /// Atomically increment and return the shared lineage counter used
    /// to seed per-process id generation
    fn next_lineage(&self) -> Result<u64>;
}

/// Extract the required `_id` field from a record about to be written
pub(crate) fn record_id(record: &StorageRecord) -> Result<String> {
    record
        .get(stratum_core::translate::FIELD_ID)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| stratum_core::StratumError::Internal {
            message: "record written without an '_id' field".to_string(),
        })
}
