//! In-memory document backend
//!
//! The reference implementation of the backend contract and the
//! default backend for tests. One process-wide mutex stands in for
//! the per-record atomicity a real store provides.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use stratum_core::translate::{StorageFilter, StorageRecord};
use stratum_core::StratumError;

use crate::errors::{backend_error, Result};

use super::matching::{apply_update, criteria_match, record_matches, sort_records};
use super::{record_id, DocumentBackend, UpdateCriteria, UpdateSpec};

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, BTreeMap<String, StorageRecord>>,
    lineage: u64,
}

/// Mutex-guarded in-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| backend_error("memory_lock", e))
    }
}

impl DocumentBackend for MemoryBackend {
    fn insert(&self, collection: &str, record: StorageRecord) -> Result<()> {
        let id = record_id(&record)?;
        let mut state = self.lock()?;
        let records = state.collections.entry(collection.to_string()).or_default();
        if records.contains_key(&id) {
            return Err(StratumError::DuplicateId { id });
        }
        records.insert(id, record);
        Ok(())
    }

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<StorageRecord>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    fn find(&self, collection: &str, filter: &StorageFilter) -> Result<Vec<StorageRecord>> {
        let state = self.lock()?;
        let mut results: Vec<StorageRecord> = state
            .collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| record_matches(record, &filter.criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some((field, direction)) = &filter.sort {
            sort_records(&mut results, field, *direction);
        }
        Ok(results)
    }

    fn update_one(
        &self,
        collection: &str,
        criteria: &UpdateCriteria,
        update: &UpdateSpec,
    ) -> Result<u64> {
        let mut state = self.lock()?;
        let Some(record) = state
            .collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(&criteria.id))
        else {
            return Ok(0);
        };
        if !criteria_match(record, criteria) {
            return Ok(0);
        }
        apply_update(record, criteria, update);
        Ok(1)
    }

    fn upsert(&self, collection: &str, id: &str, mut record: StorageRecord) -> Result<()> {
        record.insert(
            stratum_core::translate::FIELD_ID.to_string(),
            serde_json::Value::String(id.to_string()),
        );
        let mut state = self.lock()?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), record);
        Ok(())
    }

    fn remove(&self, collection: &str, id: &str) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(state
            .collections
            .get_mut(collection)
            .and_then(|records| records.remove(id))
            .is_some())
    }

    fn drop_collection(&self, collection: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.collections.remove(collection);
        Ok(())
    }

    fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state.collections.keys().cloned().collect())
    }

    fn next_lineage(&self) -> Result<u64> {
        let mut state = self.lock()?;
        state.lineage += 1;
        Ok(state.lineage)
    }
}
