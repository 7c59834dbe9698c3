//! Document id generation
//!
//! Ids are opaque strings of the form `<lineage>.<counter>`. The
//! lineage is fetched once per process from an atomically incremented
//! counter record in the backend, so concurrent processes never mint
//! colliding ids without needing a distributed lock. The in-process
//! counter is mutex-protected so concurrent callers in the same
//! process never observe the same id twice. History versions draw from
//! a separate lineage so their ids never collide with document ids.

use std::sync::{Arc, Mutex};

use crate::backend::DocumentBackend;
use crate::errors::{backend_error, Result};

#[derive(Default)]
struct Lane {
    lineage: Option<u64>,
    next: u64,
}

impl Lane {
    fn next_id(&mut self, backend: &dyn DocumentBackend) -> Result<String> {
        let lineage = match self.lineage {
            Some(lineage) => lineage,
            None => {
                // seeded lazily on first use, not at construction
                let lineage = backend.next_lineage()?;
                tracing::debug!(lineage, "seeded id lineage");
                self.lineage = Some(lineage);
                self.next = 1;
                lineage
            }
        };
        let id = format!("{}.{}", lineage, self.next);
        self.next += 1;
        Ok(id)
    }
}

/// Per-process generator of document and history-version ids
pub struct IdGenerator {
    backend: Arc<dyn DocumentBackend>,
    documents: Mutex<Lane>,
    history: Mutex<Lane>,
}

impl IdGenerator {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            documents: Mutex::new(Lane::default()),
            history: Mutex::new(Lane::default()),
        }
    }

    /// Next document id
    pub fn next_id(&self) -> Result<String> {
        let mut lane = self
            .documents
            .lock()
            .map_err(|e| backend_error("idgen_lock", e))?;
        lane.next_id(self.backend.as_ref())
    }

    /// Next history-version id
    pub fn next_history_id(&self) -> Result<String> {
        let mut lane = self
            .history
            .lock()
            .map_err(|e| backend_error("idgen_lock", e))?;
        lane.next_id(self.backend.as_ref())
    }
}
