//! History archive
//!
//! Captures an immutable snapshot of a document's prior state before
//! every mutating patch. A snapshot is the full storage record copied
//! verbatim under a fresh history id into the collection's history
//! sibling, tagged with back-references to the original document.
//! Snapshots are never mutated and never reclaimed; a snapshot whose
//! patch lost its race (or never ran) is a harmless orphan.

use std::sync::Arc;

use serde_json::json;
use stratum_core::translate::{
    canonicalize_url, from_storage, StorageFilter, FIELD_ID, FIELD_URL, FIELD_VERSION_OF,
    FIELD_VERSION_OF_ID,
};
use stratum_core::{Document, StratumError};
use stratum_core_types::{CollectionKey, HostContext};

use crate::backend::DocumentBackend;
use crate::errors::Result;
use crate::idgen::IdGenerator;

pub struct HistoryArchive {
    backend: Arc<dyn DocumentBackend>,
    ids: Arc<IdGenerator>,
}

impl HistoryArchive {
    pub fn new(backend: Arc<dyn DocumentBackend>, ids: Arc<IdGenerator>) -> Self {
        Self { backend, ids }
    }

    /// Snapshot the current stored state of a document into the history
    /// collection, returning the new history version's URL
    pub fn snapshot(&self, key: &CollectionKey, host: &HostContext, id: &str) -> Result<String> {
        let record = self
            .backend
            .find_by_id(&key.primary_collection(), id)?
            .ok_or_else(|| StratumError::not_found(id))?;

        let history_id = self.ids.next_history_id()?;
        let history_url = host.history_url(key, &history_id);

        let mut copy = record;
        if let Some(original_id) = copy.get(FIELD_ID).cloned() {
            copy.insert(FIELD_VERSION_OF_ID.to_string(), original_id);
        }
        if let Some(original_url) = copy.get(FIELD_URL).cloned() {
            copy.insert(FIELD_VERSION_OF.to_string(), original_url);
        }
        copy.insert(FIELD_ID.to_string(), json!(history_id));
        copy.insert(
            FIELD_URL.to_string(),
            json!(canonicalize_url(&history_url, host, &history_url)?),
        );

        self.backend.insert(&key.history_collection(), copy)?;
        tracing::debug!(id, %history_url, "captured history version");
        Ok(history_url)
    }

    /// Bulk lookup of history versions by URL. The caller owns the
    /// history-URL list (stored per document) and any ordering
    /// disambiguation.
    pub fn versions_of(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        urls: &[String],
    ) -> Result<Vec<Document>> {
        let canonical = urls
            .iter()
            .map(|url| canonicalize_url(url, host, url).map(serde_json::Value::String))
            .collect::<Result<Vec<_>>>()?;
        let filter = StorageFilter {
            criteria: json!({ FIELD_URL: { "$in": canonical } }),
            sort: None,
        };
        self.backend
            .find(&key.history_collection(), &filter)?
            .iter()
            .map(|record| from_storage(record, host))
            .collect()
    }
}
