//! Versioned document operations
//!
//! Create/read/delete/patch of versioned documents in a named
//! collection. All state lives in the backend; optimistic concurrency
//! is enforced per subject-level update step through the backend's
//! atomic conditional update.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use stratum_core::model::{PredicatePatch, SubjectNode, SubjectPatch, SubjectUpdates};
use stratum_core::query::Query;
use stratum_core::translate::{
    canonicalize_url, escape_predicate, from_storage, query_to_storage, subject_to_storage,
    to_storage, value_to_storage, StorageRecord, FIELD_ID, FIELD_LAST_MODIFIED,
    FIELD_LAST_MODIFIED_BY, FIELD_MODIFICATION_COUNT,
};
use stratum_core::{Document, StratumError, SystemMetadata};
use stratum_core_types::{vocab, CollectionKey, HostContext};

use crate::backend::{DocumentBackend, UpdateCriteria, UpdateSpec};
use crate::errors::Result;
use crate::history::HistoryArchive;
use crate::idgen::IdGenerator;

/// Sentinel modification count that disables the optimistic check
const UNCONDITIONAL: i64 = -1;

pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    ids: Arc<IdGenerator>,
    history: HistoryArchive,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        let ids = Arc::new(IdGenerator::new(backend.clone()));
        Self {
            history: HistoryArchive::new(backend.clone(), ids.clone()),
            backend,
            ids,
        }
    }

    pub fn history(&self) -> &HistoryArchive {
        &self.history
    }

    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    /// Create a new document. The document's subjects may use URLs
    /// relative to the (not yet known) document URL; they are resolved
    /// during translation. Returns (id, url, stored document).
    pub fn create(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        actor: &str,
        document: &Document,
        explicit_id: Option<&str>,
    ) -> Result<(String, String, Document)> {
        let id = match explicit_id {
            Some(id) => id.to_string(),
            None => self.ids.next_id()?,
        };
        let url = host.document_url(key, &id);
        let now = Utc::now();

        let mut stored = document.clone();
        stored.url = url.clone();
        stored.meta = SystemMetadata {
            modification_count: 0,
            created: Some(now),
            created_by: Some(actor.to_string()),
            last_modified: Some(now),
            last_modified_by: Some(actor.to_string()),
            history: Vec::new(),
            version_of: None,
        };

        let mut record = to_storage(&stored, host, &url)?;
        record.insert(FIELD_ID.to_string(), json!(id));
        self.backend.insert(&key.primary_collection(), record.clone())?;
        tracing::debug!(%url, "created document");

        let created = from_storage(&record, host)?;
        Ok((id, url, created))
    }

    pub fn get(&self, key: &CollectionKey, host: &HostContext, id: &str) -> Result<Document> {
        let record = self
            .backend
            .find_by_id(&key.primary_collection(), id)?
            .ok_or_else(|| StratumError::not_found(id))?;
        from_storage(&record, host)
    }

    /// Unconditional remove; deleting an absent id is a successful
    /// no-op. Returns whether a document was actually removed.
    pub fn delete(&self, key: &CollectionKey, id: &str) -> Result<bool> {
        self.backend.remove(&key.primary_collection(), id)
    }

    /// Patch a document under optimistic concurrency.
    ///
    /// A history version of the pre-patch state is captured before the
    /// first mutating step; its id is fixed for the whole logical
    /// patch, so re-running the entire patch after a crash is safe:
    /// each subject step is re-attempted as a normal conditional
    /// update, and at worst an orphaned snapshot is left behind. The
    /// subject-level steps are NOT joined into one cross-subject
    /// transaction; a caller in doubt must retry the whole patch.
    ///
    /// Returns the modification count the client should present on its
    /// next patch.
    pub fn patch(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        actor: &str,
        id: &str,
        expected_mod_count: i64,
        updates: &SubjectUpdates,
    ) -> Result<i64> {
        if expected_mod_count < UNCONDITIONAL {
            return Err(StratumError::validation(format!(
                "modification count must be >= 0 (or -1 to skip the check): {}",
                expected_mod_count
            )));
        }
        let conditional = expected_mod_count != UNCONDITIONAL;
        for patch in updates.values() {
            if let SubjectPatch::Set(predicates) = patch {
                for predicate in predicates.keys() {
                    if vocab::is_system_predicate(predicate) {
                        return Err(StratumError::validation(format!(
                            "cannot set system predicate '{}'",
                            predicate
                        )));
                    }
                }
            }
        }

        let collection = key.primary_collection();
        let doc_url = host.document_url(key, id);

        // history strictly precedes the mutation it protects
        let history_url = self.history.snapshot(key, host, id)?;
        let mut mod_count = expected_mod_count;

        // removals first, all pulled in one atomic step
        let removals = updates
            .iter()
            .filter(|(_, patch)| matches!(patch, SubjectPatch::Remove))
            .map(|(subject, _)| canonicalize_url(subject, host, &doc_url))
            .collect::<Result<Vec<_>>>()?;
        if !removals.is_empty() {
            let criteria = UpdateCriteria {
                id: id.to_string(),
                modification_count: conditional.then_some(mod_count),
                subject_id: None,
            };
            let update = UpdateSpec {
                increment_modification_count: 1,
                pull_subjects: removals,
                push_history: Some(history_url.clone()),
                ..Default::default()
            };
            if self.backend.update_one(&collection, &criteria, &update)? != 1 {
                return Err(StratumError::conflict(id, mod_count));
            }
            mod_count += 1;
        }

        for (subject, patch) in updates {
            let SubjectPatch::Set(predicates) = patch else {
                continue;
            };
            let canonical_subject = canonicalize_url(subject, host, &doc_url)?;
            let touch = self.metadata_touch(actor, host, &doc_url)?;

            // first assume the subject is already present and update it
            // positionally
            let mut set_subject_fields = serde_json::Map::new();
            let mut unset_subject_fields = Vec::new();
            for (predicate, ppatch) in predicates {
                let field = escape_predicate(predicate);
                match ppatch {
                    PredicatePatch::Unset => unset_subject_fields.push(field),
                    PredicatePatch::Set(values) if values.is_empty() => {
                        unset_subject_fields.push(field)
                    }
                    PredicatePatch::Set(values) => {
                        let encoded = if values.len() == 1 {
                            value_to_storage(&values[0], host, &doc_url)?
                        } else {
                            serde_json::Value::Array(
                                values
                                    .iter()
                                    .map(|v| value_to_storage(v, host, &doc_url))
                                    .collect::<Result<Vec<_>>>()?,
                            )
                        };
                        set_subject_fields.insert(field, encoded);
                    }
                }
            }
            let criteria = UpdateCriteria {
                id: id.to_string(),
                modification_count: conditional.then_some(mod_count),
                subject_id: Some(canonical_subject),
            };
            let update = UpdateSpec {
                increment_modification_count: 1,
                set_fields: touch.clone(),
                set_subject_fields,
                unset_subject_fields,
                push_history: Some(history_url.clone()),
                ..Default::default()
            };
            if self.backend.update_one(&collection, &criteria, &update)? == 1 {
                mod_count += 1;
                continue;
            }

            // the subject must not be in the graph yet: retry as a push
            // of a whole new subject element
            let mut node = SubjectNode::new();
            for (predicate, ppatch) in predicates {
                if let PredicatePatch::Set(values) = ppatch {
                    if !values.is_empty() {
                        node.insert(predicate.clone(), values.clone());
                    }
                }
            }
            let element = subject_to_storage(subject, &node, host, &doc_url)?;
            let criteria = UpdateCriteria {
                id: id.to_string(),
                modification_count: conditional.then_some(mod_count),
                subject_id: None,
            };
            let update = UpdateSpec {
                increment_modification_count: 1,
                set_fields: touch,
                push_subject: Some(element),
                push_history: Some(history_url.clone()),
                ..Default::default()
            };
            if self.backend.update_one(&collection, &criteria, &update)? != 1 {
                // the client's expected modification count is stale
                return Err(StratumError::conflict(id, mod_count));
            }
            mod_count += 1;
        }

        if conditional {
            Ok(mod_count)
        } else {
            let record = self
                .backend
                .find_by_id(&collection, id)?
                .ok_or_else(|| StratumError::not_found(id))?;
            Ok(record
                .get(FIELD_MODIFICATION_COUNT)
                .and_then(|v| v.as_i64())
                .unwrap_or(0))
        }
    }

    /// Execute a query; always succeeds with zero or more matches
    pub fn execute_query(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        query: &Query,
    ) -> Result<Vec<Document>> {
        let collection_url = host.collection_url(key);
        let filter = query_to_storage(query, host, &collection_url)?;
        self.backend
            .find(&key.primary_collection(), &filter)?
            .iter()
            .map(|record| from_storage(record, host))
            .collect()
    }

    pub fn get_prior_versions(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        history_urls: &[String],
    ) -> Result<Vec<Document>> {
        self.history.versions_of(key, host, history_urls)
    }

    /// Tenants that currently have a collection with the given
    /// namespace. Derived (history/tracking) collections are not
    /// namespaces of their own.
    pub fn tenant_names(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self
            .backend
            .collection_names()?
            .iter()
            .filter_map(|name| match name.split_once('/') {
                Some((tenant, ns)) if ns == namespace => Some(tenant.to_string()),
                _ => None,
            })
            .collect())
    }

    /// Drop the primary collection and its derived siblings
    pub fn drop_collection(&self, key: &CollectionKey) -> Result<()> {
        self.backend.drop_collection(&key.primary_collection())?;
        self.backend.drop_collection(&key.history_collection())?;
        self.backend.drop_collection(&key.tracking_collection())?;
        tracing::debug!(collection = %key.primary_collection(), "dropped collection");
        Ok(())
    }

    fn metadata_touch(
        &self,
        actor: &str,
        host: &HostContext,
        doc_url: &str,
    ) -> Result<StorageRecord> {
        let mut fields = StorageRecord::new();
        fields.insert(
            FIELD_LAST_MODIFIED.to_string(),
            json!(Utc::now().to_rfc3339()),
        );
        fields.insert(
            FIELD_LAST_MODIFIED_BY.to_string(),
            json!(canonicalize_url(actor, host, doc_url)?),
        );
        Ok(fields)
    }
}
