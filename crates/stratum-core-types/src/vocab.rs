//! Namespace constants and reserved system predicates

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const DC: &str = "http://purl.org/dc/terms/";
pub const TRS: &str = "http://jazz.net/ns/trs#";

/// The store's own namespace for system properties
pub const SYS: &str = "http://stratum.dev/ns#";

pub const CREATOR: &str = "http://purl.org/dc/terms/creator";
pub const CREATED: &str = "http://purl.org/dc/terms/created";
pub const MODIFICATION_COUNT: &str = "http://stratum.dev/ns#modificationCount";
pub const LAST_MODIFIED: &str = "http://stratum.dev/ns#lastModified";
pub const LAST_MODIFIED_BY: &str = "http://stratum.dev/ns#lastModifiedBy";
pub const HISTORY: &str = "http://stratum.dev/ns#history";
pub const VERSION_OF: &str = "http://stratum.dev/ns#versionOf";

/// Predicates owned by the store. A caller-supplied document or patch
/// that writes any of these is rejected with a validation error.
pub const SYSTEM_PREDICATES: &[&str] = &[
    CREATOR,
    CREATED,
    MODIFICATION_COUNT,
    LAST_MODIFIED,
    LAST_MODIFIED_BY,
    HISTORY,
    VERSION_OF,
    "@id",
    "_id",
];

/// True if `predicate` is reserved for system metadata
pub fn is_system_predicate(predicate: &str) -> bool {
    SYSTEM_PREDICATES.contains(&predicate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_predicates_are_reserved() {
        assert!(is_system_predicate(MODIFICATION_COUNT));
        assert!(is_system_predicate("_id"));
        assert!(!is_system_predicate("http://purl.org/dc/terms/title"));
    }
}
