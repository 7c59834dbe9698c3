//! Abstract query compilation into the backend filter language

use serde_json::json;
use stratum_core_types::HostContext;

use crate::errors::Result;
use crate::query::{Constraint, Query, SubjectClause, SubjectPattern};

use super::urls::{canonicalize_url, query_predicate_path};
use super::values::value_to_storage;
use super::{StorageFilter, FIELD_GRAPH, FIELD_URL};

/// Compile an abstract query into a backend filter.
///
/// Each subject clause becomes an `$elemMatch` over the `@graph` array;
/// multiple clauses are joined with `$and`. The wildcard subject omits
/// the `@id` pin so the clause matches in any subject node.
pub fn query_to_storage(
    query: &Query,
    host: &HostContext,
    collection_url: &str,
) -> Result<StorageFilter> {
    let mut clauses = Vec::with_capacity(query.subjects.len());
    for (pattern, clause) in &query.subjects {
        let compiled = compile_subject(pattern, clause, host, collection_url)?;
        clauses.push(json!({ FIELD_GRAPH: { "$elemMatch": compiled } }));
    }

    let criteria = match clauses.len() {
        0 => json!({}),
        1 => clauses.pop().unwrap_or_default(),
        _ => json!({ "$and": clauses }),
    };

    let sort = query
        .order_by
        .as_ref()
        .map(|(predicate, direction)| (query_predicate_path(predicate), *direction));

    Ok(StorageFilter { criteria, sort })
}

fn compile_subject(
    pattern: &SubjectPattern,
    clause: &SubjectClause,
    host: &HostContext,
    collection_url: &str,
) -> Result<serde_json::Value> {
    let mut compiled = serde_json::Map::new();
    if let SubjectPattern::Url(url) = pattern {
        compiled.insert(
            FIELD_URL.to_string(),
            json!(canonicalize_url(url, host, collection_url)?),
        );
    }
    for (predicate, constraint) in &clause.constraints {
        compiled.insert(
            query_predicate_path(predicate),
            compile_constraint(constraint, host, collection_url)?,
        );
    }
    if let Some(pair) = &clause.either {
        let ((left_predicate, left), (right_predicate, right)) = &**pair;
        // each branch is compiled recursively like any other clause
        compiled.insert(
            "$or".to_string(),
            json!([
                { query_predicate_path(left_predicate): compile_constraint(left, host, collection_url)? },
                { query_predicate_path(right_predicate): compile_constraint(right, host, collection_url)? },
            ]),
        );
    }
    Ok(serde_json::Value::Object(compiled))
}

fn compile_constraint(
    constraint: &Constraint,
    host: &HostContext,
    collection_url: &str,
) -> Result<serde_json::Value> {
    match constraint {
        Constraint::Equals(value) => value_to_storage(value, host, collection_url),
        Constraint::AnyOf(values) => {
            let encoded = values
                .iter()
                .map(|v| value_to_storage(v, host, collection_url))
                .collect::<Result<Vec<_>>>()?;
            Ok(json!({ "$in": encoded }))
        }
        Constraint::Exists(present) => Ok(json!({ "$exists": present })),
        Constraint::All(values) => {
            let encoded = values
                .iter()
                .map(|v| value_to_storage(v, host, collection_url))
                .collect::<Result<Vec<_>>>()?;
            Ok(json!({ "$all": encoded }))
        }
    }
}
