//! Collection addressing and request host context
//!
//! A logical collection is keyed by (tenant, namespace) and maps 1:1 to a
//! physical backend collection. The history archive and the change feed
//! each occupy a derived sibling collection. `HostContext` carries the
//! public hostname of the request and owns construction of public
//! resource URLs under the fixed default layout
//! `http://{host}/{tenant}/{namespace}/{id}`.

use serde::{Deserialize, Serialize};

/// Suffix appended to a namespace for its history sibling collection
pub const HISTORY_SUFFIX: &str = "_history";

/// Suffix appended to a namespace for its change-feed sibling collection
pub const TRACKING_SUFFIX: &str = "_tracking";

/// Logical collection key: (tenant, namespace)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionKey {
    tenant: String,
    namespace: String,
}

impl CollectionKey {
    pub fn new(tenant: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            namespace: namespace.into(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Physical name of the primary backend collection
    pub fn primary_collection(&self) -> String {
        format!("{}/{}", self.tenant, self.namespace)
    }

    /// Physical name of the history sibling collection
    pub fn history_collection(&self) -> String {
        format!("{}/{}{}", self.tenant, self.namespace, HISTORY_SUFFIX)
    }

    /// Physical name of the change-feed sibling collection
    pub fn tracking_collection(&self) -> String {
        format!("{}/{}{}", self.tenant, self.namespace, TRACKING_SUFFIX)
    }
}

/// Public hostname of the requests a document URL is minted for.
///
/// The full multi-tenant URL policy is an external collaborator; this
/// type pins the one default layout the store itself needs to mint and
/// recognize its own URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    hostname: String,
}

impl HostContext {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// `http://{host}` origin prefix
    pub fn http_prefix(&self) -> String {
        format!("http://{}", self.hostname)
    }

    /// `https://{host}` origin prefix
    pub fn https_prefix(&self) -> String {
        format!("https://{}", self.hostname)
    }

    /// Public URL of a document in a collection
    pub fn document_url(&self, key: &CollectionKey, id: &str) -> String {
        format!(
            "http://{}/{}/{}/{}",
            self.hostname,
            key.tenant(),
            key.namespace(),
            id
        )
    }

    /// Public URL of the collection itself
    pub fn collection_url(&self, key: &CollectionKey) -> String {
        format!(
            "http://{}/{}/{}",
            self.hostname,
            key.tenant(),
            key.namespace()
        )
    }

    /// Public URL of a history version document
    pub fn history_url(&self, key: &CollectionKey, history_id: &str) -> String {
        format!(
            "http://{}/{}/{}{}/{}",
            self.hostname,
            key.tenant(),
            key.namespace(),
            HISTORY_SUFFIX,
            history_id
        )
    }

    /// Public URL of a change-feed artifact (TRS root, segment, base)
    pub fn tracking_url(&self, key: &CollectionKey, doc_id: &str) -> String {
        format!(
            "http://{}/{}/{}{}/{}",
            self.hostname,
            key.tenant(),
            key.namespace(),
            TRACKING_SUFFIX,
            doc_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names_are_deterministic() {
        let key = CollectionKey::new("acme", "tasks");
        assert_eq!(key.primary_collection(), "acme/tasks");
        assert_eq!(key.history_collection(), "acme/tasks_history");
        assert_eq!(key.tracking_collection(), "acme/tasks_tracking");
    }

    #[test]
    fn test_url_construction() {
        let key = CollectionKey::new("acme", "tasks");
        let host = HostContext::new("example.com:3000");
        assert_eq!(
            host.document_url(&key, "1.7"),
            "http://example.com:3000/acme/tasks/1.7"
        );
        assert_eq!(
            host.collection_url(&key),
            "http://example.com:3000/acme/tasks"
        );
        assert_eq!(
            host.tracking_url(&key, "trs"),
            "http://example.com:3000/acme/tasks_tracking/trs"
        );
    }
}
