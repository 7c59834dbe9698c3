//! Value/Query Translator
//!
//! Stateless mapping between the abstract document model and the
//! backend's storage encoding, plus compilation of abstract queries
//! into the backend filter language.
//!
//! Storage record layout (one JSON object per document):
//!
//! ```text
//! {
//!   "_id": document id,
//!   "@id": document URL in storage-canonical form,
//!   "@graph": [ { "@id": subject URL, "<predicate>": <value(s)>, ... }, ... ],
//!   "_modificationCount": number,
//!   "_created" / "_lastModified": RFC 3339 timestamps,
//!   "_createdBy" / "_lastModifiedBy": actor URLs,
//!   "_history": [history version URLs],
//!   "_versionOf" / "_versionOfId": history back-references
//! }
//! ```
//!
//! Same-origin URLs are stored in a host-independent canonical form
//! (`urn:stratum:<path>`) so a deployment can be re-hosted without
//! rewriting stored documents. This module is the only place that
//! knows the escaping rule for predicate names used as backend field
//! paths; every other component routes predicate encoding through it.

mod query;
mod record;
mod urls;
mod values;

pub use query::query_to_storage;
pub use record::{from_storage, subject_to_storage, to_storage};
pub use urls::{
    canonicalize_url, escape_predicate, query_predicate_path, restore_url, unescape_predicate,
    STORAGE_PREFIX,
};
pub use values::{value_from_storage, value_to_storage};

use crate::query::SortDirection;

/// A document in the backend's storage encoding
pub type StorageRecord = serde_json::Map<String, serde_json::Value>;

/// A compiled backend filter plus optional sort specification
#[derive(Debug, Clone, PartialEq)]
pub struct StorageFilter {
    /// Criteria in the backend's filter language
    pub criteria: serde_json::Value,
    /// Sort by an (escaped) predicate field path
    pub sort: Option<(String, SortDirection)>,
}

impl StorageFilter {
    /// A filter that matches every record in a collection
    pub fn match_all() -> Self {
        Self {
            criteria: serde_json::Value::Object(serde_json::Map::new()),
            sort: None,
        }
    }
}

// Storage record field names. `@`-prefixed fields are part of the graph
// encoding; `_`-prefixed fields are system metadata.
pub const FIELD_ID: &str = "_id";
pub const FIELD_URL: &str = "@id";
pub const FIELD_GRAPH: &str = "@graph";
pub const FIELD_MODIFICATION_COUNT: &str = "_modificationCount";
pub const FIELD_CREATED: &str = "_created";
pub const FIELD_CREATED_BY: &str = "_createdBy";
pub const FIELD_LAST_MODIFIED: &str = "_lastModified";
pub const FIELD_LAST_MODIFIED_BY: &str = "_lastModifiedBy";
pub const FIELD_HISTORY: &str = "_history";
pub const FIELD_VERSION_OF: &str = "_versionOf";
pub const FIELD_VERSION_OF_ID: &str = "_versionOfId";
