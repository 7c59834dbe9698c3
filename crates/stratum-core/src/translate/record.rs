//! Whole-document translation to and from storage records

use chrono::{DateTime, Utc};
use serde_json::json;
use stratum_core_types::{vocab, HostContext};

use crate::errors::{Result, StratumError};
use crate::model::{Document, SubjectNode, SystemMetadata};

use super::urls::{canonicalize_url, escape_predicate, restore_url, unescape_predicate};
use super::values::{value_from_storage, value_to_storage};
use super::{
    StorageRecord, FIELD_CREATED, FIELD_CREATED_BY, FIELD_GRAPH, FIELD_HISTORY,
    FIELD_LAST_MODIFIED, FIELD_LAST_MODIFIED_BY, FIELD_MODIFICATION_COUNT, FIELD_URL,
    FIELD_VERSION_OF,
};

/// Translate a document into its storage record.
///
/// The record's `_id` field is owned by the document store and is not
/// set here. Writing a reserved system predicate fails with a
/// validation error.
pub fn to_storage(doc: &Document, host: &HostContext, base_url: &str) -> Result<StorageRecord> {
    let mut graph = Vec::with_capacity(doc.subjects.len());
    for (subject_url, node) in &doc.subjects {
        graph.push(subject_to_storage(subject_url, node, host, base_url)?);
    }

    let mut record = StorageRecord::new();
    record.insert(
        FIELD_URL.to_string(),
        json!(canonicalize_url(&doc.url, host, base_url)?),
    );
    record.insert(FIELD_GRAPH.to_string(), serde_json::Value::Array(graph));
    record.insert(
        FIELD_MODIFICATION_COUNT.to_string(),
        json!(doc.meta.modification_count),
    );
    if let Some(created) = &doc.meta.created {
        record.insert(FIELD_CREATED.to_string(), json!(created.to_rfc3339()));
    }
    if let Some(created_by) = &doc.meta.created_by {
        record.insert(
            FIELD_CREATED_BY.to_string(),
            json!(canonicalize_url(created_by, host, base_url)?),
        );
    }
    if let Some(modified) = &doc.meta.last_modified {
        record.insert(FIELD_LAST_MODIFIED.to_string(), json!(modified.to_rfc3339()));
    }
    if let Some(modified_by) = &doc.meta.last_modified_by {
        record.insert(
            FIELD_LAST_MODIFIED_BY.to_string(),
            json!(canonicalize_url(modified_by, host, base_url)?),
        );
    }
    if !doc.meta.history.is_empty() {
        record.insert(FIELD_HISTORY.to_string(), json!(doc.meta.history));
    }
    if let Some(version_of) = &doc.meta.version_of {
        record.insert(
            FIELD_VERSION_OF.to_string(),
            json!(canonicalize_url(version_of, host, base_url)?),
        );
    }
    Ok(record)
}

/// Translate one subject node into a `@graph` array element
pub fn subject_to_storage(
    subject_url: &str,
    node: &SubjectNode,
    host: &HostContext,
    base_url: &str,
) -> Result<serde_json::Value> {
    let mut element = serde_json::Map::new();
    for (predicate, values) in node {
        if vocab::is_system_predicate(predicate) {
            return Err(StratumError::validation(format!(
                "cannot set system predicate '{}'",
                predicate
            )));
        }
        let encoded = if values.len() == 1 {
            // single values collapse to a bare value in storage
            value_to_storage(&values[0], host, base_url)?
        } else {
            serde_json::Value::Array(
                values
                    .iter()
                    .map(|v| value_to_storage(v, host, base_url))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        element.insert(escape_predicate(predicate), encoded);
    }
    element.insert(
        FIELD_URL.to_string(),
        json!(canonicalize_url(subject_url, host, base_url)?),
    );
    Ok(serde_json::Value::Object(element))
}

/// Translate a storage record back into a document, reconstituting
/// system metadata. History version records surface their original
/// document's URL through `meta.version_of`.
pub fn from_storage(record: &StorageRecord, host: &HostContext) -> Result<Document> {
    let stored_url = record
        .get(FIELD_URL)
        .and_then(|v| v.as_str())
        .ok_or_else(|| StratumError::Serialization {
            message: format!("storage record missing '{}'", FIELD_URL),
        })?;

    let mut doc = Document::new(restore_url(stored_url, host));

    if let Some(graph) = record.get(FIELD_GRAPH).and_then(|g| g.as_array()) {
        for element in graph {
            let element = element.as_object().ok_or_else(|| StratumError::Serialization {
                message: "non-object element in '@graph'".to_string(),
            })?;
            let subject_url = element
                .get(FIELD_URL)
                .and_then(|v| v.as_str())
                .map(|u| restore_url(u, host))
                .ok_or_else(|| StratumError::Serialization {
                    message: "subject element missing '@id'".to_string(),
                })?;
            let mut node = SubjectNode::new();
            for (key, stored) in element {
                if key == FIELD_URL {
                    continue;
                }
                let values = match stored {
                    serde_json::Value::Array(items) => items
                        .iter()
                        .map(|item| value_from_storage(item, host))
                        .collect(),
                    single => vec![value_from_storage(single, host)],
                };
                node.insert(unescape_predicate(key), values);
            }
            doc.subjects.insert(subject_url, node);
        }
    }

    doc.meta = metadata_from_storage(record, host)?;
    Ok(doc)
}

fn metadata_from_storage(record: &StorageRecord, host: &HostContext) -> Result<SystemMetadata> {
    let mut meta = SystemMetadata {
        modification_count: record
            .get(FIELD_MODIFICATION_COUNT)
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        ..Default::default()
    };
    meta.created = parse_timestamp(record.get(FIELD_CREATED))?;
    meta.last_modified = parse_timestamp(record.get(FIELD_LAST_MODIFIED))?;
    meta.created_by = record
        .get(FIELD_CREATED_BY)
        .and_then(|v| v.as_str())
        .map(|u| restore_url(u, host));
    meta.last_modified_by = record
        .get(FIELD_LAST_MODIFIED_BY)
        .and_then(|v| v.as_str())
        .map(|u| restore_url(u, host));
    if let Some(history) = record.get(FIELD_HISTORY).and_then(|v| v.as_array()) {
        meta.history = history
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect();
    }
    meta.version_of = record
        .get(FIELD_VERSION_OF)
        .and_then(|v| v.as_str())
        .map(|u| restore_url(u, host));
    Ok(meta)
}

fn parse_timestamp(value: Option<&serde_json::Value>) -> Result<Option<DateTime<Utc>>> {
    match value.and_then(|v| v.as_str()) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| StratumError::Serialization {
                message: format!("bad stored timestamp '{}': {}", raw, e),
            }),
    }
}
