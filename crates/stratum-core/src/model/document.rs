//! Versioned documents and their subject nodes
//!
//! A document is identified by a resource URL and holds a set of subject
//! nodes keyed by subject URL; the document's own URL is one subject
//! among possibly several (an owned sub-resource is another). System
//! metadata is carried as a typed struct, not mixed into the predicate
//! maps: rendering metadata as RDF properties belongs to the
//! presentation layer, and keeping it out of the subject maps lets the
//! reserved-predicate rule be enforced in exactly one place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::Value;

/// One resource's bag of predicate → value(s) within a document graph.
///
/// Multi-valued predicates are ordered sequences; single-valued
/// predicates collapse to a bare value only inside the storage
/// encoding and are always exposed here as a sequence.
pub type SubjectNode = BTreeMap<String, Vec<Value>>;

/// System-owned metadata on a stored document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetadata {
    /// Optimistic-concurrency version counter, starts at 0
    pub modification_count: i64,
    pub created: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    /// Ordered history-version URLs, oldest first
    pub history: Vec<String>,
    /// For history versions: URL of the document this is a version of
    pub version_of: Option<String>,
}

/// A versioned document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Public resource URL of the document
    pub url: String,
    /// Subject nodes keyed by subject URL
    pub subjects: BTreeMap<String, SubjectNode>,
    /// System metadata (empty/zeroed on documents not yet stored)
    pub meta: SystemMetadata,
}

impl Document {
    /// Create an empty document for the given resource URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subjects: BTreeMap::new(),
            meta: SystemMetadata::default(),
        }
    }

    /// The subject node for the document's own URL, if present
    pub fn primary_subject(&self) -> Option<&SubjectNode> {
        self.subjects.get(&self.url)
    }

    /// Append a value under (subject, predicate), creating both as needed
    pub fn add_value(
        &mut self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: Value,
    ) -> &mut Self {
        self.subjects
            .entry(subject.into())
            .or_default()
            .entry(predicate.into())
            .or_default()
            .push(value);
        self
    }

    /// All values for (subject, predicate); empty when absent
    pub fn values(&self, subject: &str, predicate: &str) -> &[Value] {
        self.subjects
            .get(subject)
            .and_then(|node| node.get(predicate))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value for (subject, predicate)
    pub fn value(&self, subject: &str, predicate: &str) -> Option<&Value> {
        self.values(subject, predicate).first()
    }

    /// Equality that ignores the ordering of each predicate's value
    /// sequence. The round-trip guarantee is stated up to this relation.
    pub fn equals_ignoring_value_order(&self, other: &Document) -> bool {
        if self.url != other.url || self.meta != other.meta {
            return false;
        }
        if self.subjects.len() != other.subjects.len() {
            return false;
        }
        self.subjects.iter().all(|(subject, node)| {
            other.subjects.get(subject).is_some_and(|other_node| {
                node.len() == other_node.len()
                    && node.iter().all(|(predicate, values)| {
                        other_node.get(predicate).is_some_and(|other_values| {
                            values.len() == other_values.len()
                                && values.iter().all(|v| other_values.contains(v))
                        })
                    })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read_values() {
        let mut doc = Document::new("http://h/t/ns/1.1");
        doc.add_value("http://h/t/ns/1.1", "http://purl.org/dc/terms/title", Value::string("a"));
        doc.add_value("http://h/t/ns/1.1", "http://purl.org/dc/terms/title", Value::string("b"));

        let values = doc.values("http://h/t/ns/1.1", "http://purl.org/dc/terms/title");
        assert_eq!(values.len(), 2);
        assert_eq!(doc.value("http://h/t/ns/1.1", "missing"), None);
        assert!(doc.primary_subject().is_some());
    }

    #[test]
    fn test_value_order_insensitive_equality() {
        let mut a = Document::new("http://h/t/ns/1");
        a.add_value("http://h/t/ns/1", "p", Value::string("x"));
        a.add_value("http://h/t/ns/1", "p", Value::string("y"));

        let mut b = Document::new("http://h/t/ns/1");
        b.add_value("http://h/t/ns/1", "p", Value::string("y"));
        b.add_value("http://h/t/ns/1", "p", Value::string("x"));

        assert!(a.equals_ignoring_value_order(&b));

        b.add_value("http://h/t/ns/1", "q", Value::boolean(true));
        assert!(!a.equals_ignoring_value_order(&b));
    }
}
