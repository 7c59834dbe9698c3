//! Document service facade
//!
//! The one object callers construct: it owns the backend, the id
//! generator, the document store, and the change feed builder, and
//! wires change recording into create/patch/delete. Constructed once
//! per process (from `StoreConfig`) and passed by reference to all
//! operations; there is no module-level state.

use std::sync::Arc;

use stratum_core::model::{ChangeKind, SubjectUpdates};
use stratum_core::query::Query;
use stratum_core::Document;
use stratum_core_types::{CollectionKey, HostContext};

use crate::backend::DocumentBackend;
use crate::config::{self, StoreConfig};
use crate::documents::DocumentStore;
use crate::errors::Result;
use crate::feed::ChangeFeedBuilder;

pub struct DocumentService {
    store: DocumentStore,
    feed: ChangeFeedBuilder,
}

impl DocumentService {
    /// Construct over an already-connected backend
    pub fn new(backend: Arc<dyn DocumentBackend>, segment_size: usize) -> Self {
        let store = DocumentStore::new(backend.clone());
        let feed = ChangeFeedBuilder::new(backend, store.ids().clone(), segment_size);
        Self { store, feed }
    }

    /// Construct the configured backend (with the startup retry
    /// policy) and the service over it
    pub fn connect(cfg: &StoreConfig) -> Result<Self> {
        let backend = config::connect(cfg)?;
        Ok(Self::new(backend, cfg.segment_size))
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn feed(&self) -> &ChangeFeedBuilder {
        &self.feed
    }

    /// Create a document and record a Creation change.
    /// Returns (document URL, stored document).
    pub fn create_document(
        &self,
        actor: &str,
        document: &Document,
        host: &HostContext,
        key: &CollectionKey,
        explicit_id: Option<&str>,
    ) -> Result<(String, Document)> {
        let (id, url, stored) = self.store.create(key, host, actor, document, explicit_id)?;
        self.feed.record_change(key, host, &url, ChangeKind::Creation)?;
        tracing::info!(actor, collection = %key.primary_collection(), id, "document created");
        Ok((url, stored))
    }

    pub fn get_document(
        &self,
        _actor: &str,
        host: &HostContext,
        key: &CollectionKey,
        id: &str,
    ) -> Result<Document> {
        self.store.get(key, host, id)
    }

    /// Delete a document; absent ids are a successful no-op. A
    /// Deletion change is recorded only when a document was actually
    /// removed.
    pub fn delete_document(
        &self,
        actor: &str,
        host: &HostContext,
        key: &CollectionKey,
        id: &str,
    ) -> Result<()> {
        let removed = self.store.delete(key, id)?;
        if removed {
            let url = host.document_url(key, id);
            self.feed.record_change(key, host, &url, ChangeKind::Deletion)?;
            tracing::info!(actor, collection = %key.primary_collection(), id, "document deleted");
        }
        Ok(())
    }

    /// Patch a document and record a Modification change. Returns the
    /// modification count the client should present next.
    pub fn patch_document(
        &self,
        actor: &str,
        expected_mod_count: i64,
        updates: &SubjectUpdates,
        host: &HostContext,
        key: &CollectionKey,
        id: &str,
    ) -> Result<i64> {
        let new_count = self
            .store
            .patch(key, host, actor, id, expected_mod_count, updates)?;
        let url = host.document_url(key, id);
        self.feed
            .record_change(key, host, &url, ChangeKind::Modification)?;
        tracing::info!(
            actor,
            collection = %key.primary_collection(),
            id,
            new_count,
            "document patched"
        );
        Ok(new_count)
    }

    pub fn execute_query(
        &self,
        _actor: &str,
        query: &Query,
        host: &HostContext,
        key: &CollectionKey,
    ) -> Result<Vec<Document>> {
        self.store.execute_query(key, host, query)
    }

    pub fn get_prior_versions(
        &self,
        _actor: &str,
        host: &HostContext,
        key: &CollectionKey,
        history_urls: &[String],
    ) -> Result<Vec<Document>> {
        self.store.get_prior_versions(key, host, history_urls)
    }

    /// Drop the collection and all derived collections
    pub fn drop_collection(
        &self,
        actor: &str,
        _host: &HostContext,
        key: &CollectionKey,
    ) -> Result<()> {
        self.store.drop_collection(key)?;
        self.feed.forget(key)?;
        tracing::info!(actor, collection = %key.primary_collection(), "collection dropped");
        Ok(())
    }
}
