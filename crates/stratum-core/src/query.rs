//! Abstract query model
//!
//! Queries are a nested subject → predicate → value-constraint
//! structure, compiled to the backend filter language by
//! `translate::query_to_storage`. A wildcard subject matches in any
//! subject node of a document. A clause may carry a single two-branch
//! `either` combinator in addition to its conjunctive predicate
//! constraints.

use std::collections::BTreeMap;

use crate::model::Value;

/// Sort direction for an order-by clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Which subject node(s) of a document a clause applies to
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectPattern {
    /// Match the subject node with this URL
    Url(String),
    /// Match in any subject node of the document
    Any,
}

/// Per-predicate value constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Exact value match (array-valued predicates match on containment)
    Equals(Value),
    /// Any of the listed values matches
    AnyOf(Vec<Value>),
    /// The predicate is present (true) or absent (false)
    Exists(bool),
    /// Every listed value is present (conjunctive containment)
    All(Vec<Value>),
}

/// Constraints on one subject node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectClause {
    /// Conjunctive predicate constraints
    pub constraints: BTreeMap<String, Constraint>,
    /// Optional disjunction over exactly two predicate clauses
    pub either: Option<Box<((String, Constraint), (String, Constraint))>>,
}

impl SubjectClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate constraint
    pub fn with(mut self, predicate: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(predicate.into(), constraint);
        self
    }

    /// Set the two-branch disjunction
    pub fn either(
        mut self,
        left: (impl Into<String>, Constraint),
        right: (impl Into<String>, Constraint),
    ) -> Self {
        self.either = Some(Box::new((
            (left.0.into(), left.1),
            (right.0.into(), right.1),
        )));
        self
    }
}

/// An abstract query over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Subject clauses, all of which must match (conjunction)
    pub subjects: Vec<(SubjectPattern, SubjectClause)>,
    /// Optional sort on a predicate
    pub order_by: Option<(String, SortDirection)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain the subject node with the given URL
    pub fn subject(mut self, url: impl Into<String>, clause: SubjectClause) -> Self {
        self.subjects.push((SubjectPattern::Url(url.into()), clause));
        self
    }

    /// Constrain any subject node of the document
    pub fn any_subject(mut self, clause: SubjectClause) -> Self {
        self.subjects.push((SubjectPattern::Any, clause));
        self
    }

    /// Sort results by a predicate
    pub fn order_by(mut self, predicate: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((predicate.into(), direction));
        self
    }
}
