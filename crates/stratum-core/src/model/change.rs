//! Change feed entries

use serde::{Deserialize, Serialize};
use stratum_core_types::vocab::TRS;

/// Kind of change recorded in the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Creation,
    Modification,
    Deletion,
}

impl ChangeKind {
    /// The TRS vocabulary URL for this kind
    pub fn as_url(&self) -> String {
        match self {
            ChangeKind::Creation => format!("{}Creation", TRS),
            ChangeKind::Modification => format!("{}Modification", TRS),
            ChangeKind::Deletion => format!("{}Deletion", TRS),
        }
    }
}

/// One entry in a collection's change log.
///
/// Sequence numbers are strictly increasing and unique within a
/// collection, starting at 1 with no gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub sequence: u64,
    pub kind: ChangeKind,
    /// URL of the resource that changed
    pub changed: String,
    /// Opaque event identifier, `urn:trs:<timestamp>:<sequence>`
    pub identifier: String,
}

impl ChangeEntry {
    pub fn new(sequence: u64, kind: ChangeKind, changed: impl Into<String>) -> Self {
        let identifier = format!(
            "urn:trs:{}:{}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"),
            sequence
        );
        Self {
            sequence,
            kind,
            changed: changed.into(),
            identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_embeds_sequence() {
        let entry = ChangeEntry::new(41, ChangeKind::Modification, "http://h/t/ns/1");
        assert!(entry.identifier.starts_with("urn:trs:"));
        assert!(entry.identifier.ends_with(":41"));
        assert_eq!(entry.kind.as_url(), "http://jazz.net/ns/trs#Modification");
    }
}
