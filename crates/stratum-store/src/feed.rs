//! Change feed builder (tracked resource sets)
//!
//! Maintains a per-collection ordered log of change entries persisted
//! as chained segments in the collection's tracking sibling, plus a
//! recomputable base snapshot so feed consumers need not replay from
//! the beginning of time.
//!
//! Layout in the tracking collection:
//! - `trs`: the root document, holding the current open segment's
//!   entries inline, a link to the newest sealed segment, and the
//!   current base snapshot URL
//! - `cl-<n>`: sealed segments of exactly N entries, chained oldest →
//!   newest through `previous` links
//! - `base-<id>`: base snapshots (membership as of a cutoff entry)
//!
//! The open segment grows to 2N entries, then splits: the oldest N are
//! sealed under the current segment number and the newest N continue
//! as the open segment under the next number.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use stratum_core::model::{ChangeEntry, ChangeKind};
use stratum_core::StratumError;
use stratum_core_types::{CollectionKey, HostContext};

use crate::backend::DocumentBackend;
use crate::errors::{backend_error, record_decode_error, Result};
use crate::idgen::IdGenerator;

const TRS_DOCUMENT_ID: &str = "trs";
const SEGMENT_ID_PREFIX: &str = "cl-";
const BASE_ID_PREFIX: &str = "base-";

/// A sealed change-log segment of exactly N entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedSegmentRecord {
    #[serde(rename = "_id")]
    pub id: String,
    /// URL of the previous (older) sealed segment, None for the first
    pub previous: Option<String>,
    /// Entries in chronological order
    pub entries: Vec<ChangeEntry>,
}

/// The tracked-resource-set root document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrsRootRecord {
    #[serde(rename = "_id")]
    pub id: String,
    /// URL of the current base snapshot
    pub base: String,
    /// URL of the newest sealed segment, None when nothing is sealed
    pub previous: Option<String>,
    /// The open segment's entries, oldest first
    pub entries: Vec<ChangeEntry>,
}

/// A recomputed membership snapshot with its cutoff point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseSnapshotRecord {
    #[serde(rename = "_id")]
    pub id: String,
    /// Identifier of the most recent change entry at rebase time;
    /// None when the log was empty
    pub cutoff: Option<String>,
    /// Member resource URLs of the tracked collection
    pub members: Vec<String>,
}

struct FeedState {
    /// Number of the current open segment (1-based)
    segment_number: u64,
    /// Open segment entries, oldest first
    entries: Vec<ChangeEntry>,
    /// URL of the current base snapshot
    base_url: String,
}

/// Per-process builder of collection change feeds.
///
/// The in-memory open-segment state is guarded by a mutex: two
/// concurrent appends in the same process must not pick the same
/// sequence number. Cross-process races resolve through the backend's
/// per-document atomicity on the TRS artifacts; a losing process
/// re-reads on its next construction.
pub struct ChangeFeedBuilder {
    backend: Arc<dyn DocumentBackend>,
    ids: Arc<IdGenerator>,
    segment_size: usize,
    states: Mutex<HashMap<CollectionKey, FeedState>>,
}

impl ChangeFeedBuilder {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        ids: Arc<IdGenerator>,
        segment_size: usize,
    ) -> Self {
        Self {
            backend,
            ids,
            segment_size,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Append a change entry for a resource, assigning the next
    /// sequence number. Returns the assigned sequence number.
    pub fn record_change(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        resource_url: &str,
        kind: ChangeKind,
    ) -> Result<u64> {
        let mut states = self.lock_states()?;
        let state = self.state_for(&mut states, key, host)?;

        let sequence = state.entries.last().map(|e| e.sequence + 1).unwrap_or(1);
        state.entries.push(ChangeEntry::new(sequence, kind, resource_url));
        tracing::debug!(sequence, ?kind, resource_url, "recorded change");

        if state.entries.len() == 2 * self.segment_size {
            self.seal_oldest(key, host, state)?;
        }
        self.persist_root(key, host, state)?;
        Ok(sequence)
    }

    /// Recompute the base snapshot from current collection membership
    /// and repoint the TRS root at it
    pub fn rebase(&self, key: &CollectionKey, host: &HostContext) -> Result<()> {
        let mut states = self.lock_states()?;
        let state = self.state_for(&mut states, key, host)?;
        self.recompute_base(key, host, state)?;
        self.persist_root(key, host, state)
    }

    /// Discard the in-memory state for a collection (used when the
    /// collection is dropped)
    pub fn forget(&self, key: &CollectionKey) -> Result<()> {
        self.lock_states()?.remove(key);
        Ok(())
    }

    fn lock_states(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<CollectionKey, FeedState>>> {
        self.states.lock().map_err(|e| backend_error("feed_lock", e))
    }

    fn state_for<'a>(
        &self,
        states: &'a mut HashMap<CollectionKey, FeedState>,
        key: &CollectionKey,
        host: &HostContext,
    ) -> Result<&'a mut FeedState> {
        match states.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(self.hydrate(key, host)?)),
        }
    }

    /// Restore builder state from the persisted TRS root, or create a
    /// fresh feed (with an initial base snapshot) when none exists
    fn hydrate(&self, key: &CollectionKey, host: &HostContext) -> Result<FeedState> {
        let tracking = key.tracking_collection();
        match self.backend.find_by_id(&tracking, TRS_DOCUMENT_ID)? {
            Some(record) => {
                let root: TrsRootRecord =
                    serde_json::from_value(serde_json::Value::Object(record))
                        .map_err(|e| record_decode_error(&tracking, e))?;
                // the open segment's number is one past the newest
                // sealed segment's; no deeper chain walk is needed
                let segment_number = match &root.previous {
                    Some(url) => segment_number_from_url(url)? + 1,
                    None => 1,
                };
                Ok(FeedState {
                    segment_number,
                    entries: root.entries,
                    base_url: root.base,
                })
            }
            None => {
                let mut state = FeedState {
                    segment_number: 1,
                    entries: Vec::new(),
                    base_url: String::new(),
                };
                self.recompute_base(key, host, &mut state)?;
                self.persist_root(key, host, &state)?;
                Ok(state)
            }
        }
    }

    fn seal_oldest(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        state: &mut FeedState,
    ) -> Result<()> {
        let sealed_entries: Vec<ChangeEntry> =
            state.entries.drain(..self.segment_size).collect();
        let sealed_id = format!("{}{}", SEGMENT_ID_PREFIX, state.segment_number);
        let record = SealedSegmentRecord {
            id: sealed_id.clone(),
            previous: previous_segment_url(key, host, state.segment_number),
            entries: sealed_entries,
        };
        self.upsert_record(key, &sealed_id, &record)?;
        tracing::debug!(segment = %sealed_id, "sealed change-log segment");
        state.segment_number += 1;
        Ok(())
    }

    fn persist_root(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        state: &FeedState,
    ) -> Result<()> {
        let root = TrsRootRecord {
            id: TRS_DOCUMENT_ID.to_string(),
            base: state.base_url.clone(),
            previous: previous_segment_url(key, host, state.segment_number),
            entries: state.entries.clone(),
        };
        self.upsert_record(key, TRS_DOCUMENT_ID, &root)
    }

    fn recompute_base(
        &self,
        key: &CollectionKey,
        host: &HostContext,
        state: &mut FeedState,
    ) -> Result<()> {
        let members = self
            .backend
            .list_ids(&key.primary_collection())?
            .iter()
            .map(|id| host.document_url(key, id))
            .collect();
        let base_id = format!("{}{}", BASE_ID_PREFIX, self.ids.next_id()?);
        let record = BaseSnapshotRecord {
            id: base_id.clone(),
            cutoff: state.entries.last().map(|e| e.identifier.clone()),
            members,
        };
        self.upsert_record(key, &base_id, &record)?;
        state.base_url = host.tracking_url(key, &base_id);
        tracing::debug!(base = %state.base_url, "recomputed base snapshot");
        Ok(())
    }

    fn upsert_record<T: Serialize>(
        &self,
        key: &CollectionKey,
        id: &str,
        record: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let map = value
            .as_object()
            .cloned()
            .ok_or_else(|| StratumError::Internal {
                message: "feed record did not serialize to an object".to_string(),
            })?;
        self.backend.upsert(&key.tracking_collection(), id, map)
    }
}

fn previous_segment_url(
    key: &CollectionKey,
    host: &HostContext,
    open_segment_number: u64,
) -> Option<String> {
    (open_segment_number > 1).then(|| {
        host.tracking_url(
            key,
            &format!("{}{}", SEGMENT_ID_PREFIX, open_segment_number - 1),
        )
    })
}

fn segment_number_from_url(url: &str) -> Result<u64> {
    url.rsplit('/')
        .next()
        .and_then(|last| last.strip_prefix(SEGMENT_ID_PREFIX))
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| StratumError::Internal {
            message: format!("bad segment URL '{}'", url),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_number_extraction() {
        assert_eq!(
            segment_number_from_url("http://h/t/ns_tracking/cl-12").unwrap(),
            12
        );
        assert!(segment_number_from_url("http://h/t/ns_tracking/trs").is_err());
    }

    #[test]
    fn test_previous_segment_chain() {
        let key = CollectionKey::new("t", "ns");
        let host = HostContext::new("h");
        assert_eq!(previous_segment_url(&key, &host, 1), None);
        assert_eq!(
            previous_segment_url(&key, &host, 3).as_deref(),
            Some("http://h/t/ns_tracking/cl-2")
        );
    }
}
