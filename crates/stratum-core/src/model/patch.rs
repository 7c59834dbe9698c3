//! Patch update vocabulary
//!
//! A patch touches one or more subjects of a document. Each touched
//! subject is either removed outright or has a set of its predicates
//! set/unset. Setting a predicate replaces its whole value sequence.

use std::collections::BTreeMap;

use super::value::Value;

/// Updates for one logical patch call, keyed by subject URL
pub type SubjectUpdates = BTreeMap<String, SubjectPatch>;

/// What to do with one subject node
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectPatch {
    /// Remove the subject node from the document
    Remove,
    /// Set/unset predicates on the subject node, creating it if absent
    Set(BTreeMap<String, PredicatePatch>),
}

impl SubjectPatch {
    /// Set a single predicate to a value sequence
    pub fn set_one(predicate: impl Into<String>, values: Vec<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(predicate.into(), PredicatePatch::Set(values));
        SubjectPatch::Set(map)
    }
}

/// What to do with one predicate of a touched subject
#[derive(Debug, Clone, PartialEq)]
pub enum PredicatePatch {
    /// Remove the predicate from the subject
    Unset,
    /// Replace the predicate's values (an empty sequence unsets)
    Set(Vec<Value>),
}
