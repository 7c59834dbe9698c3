//! Shared filter, ordering, and update evaluation
//!
//! Both backends interpret compiled filters and update specs through
//! this one module so their conditional-update and query semantics
//! cannot drift. Filter criteria come exclusively from the translator
//! in stratum-core; field names arriving here are already escaped.

use std::cmp::Ordering;

use serde_json::{json, Value};
use stratum_core::query::SortDirection;
use stratum_core::translate::{
    StorageRecord, FIELD_GRAPH, FIELD_HISTORY, FIELD_ID, FIELD_MODIFICATION_COUNT, FIELD_URL,
};

use super::{UpdateCriteria, UpdateSpec};

/// True when a record matches compiled filter criteria
pub fn record_matches(record: &StorageRecord, criteria: &Value) -> bool {
    let Some(conditions) = criteria.as_object() else {
        return false;
    };
    conditions.iter().all(|(key, cond)| match key.as_str() {
        "$and" => cond
            .as_array()
            .is_some_and(|clauses| clauses.iter().all(|c| record_matches(record, c))),
        FIELD_GRAPH => {
            let Some(elem_cond) = cond.get("$elemMatch").and_then(|c| c.as_object()) else {
                return false;
            };
            record
                .get(FIELD_GRAPH)
                .and_then(|g| g.as_array())
                .is_some_and(|graph| {
                    graph.iter().any(|element| {
                        element
                            .as_object()
                            .is_some_and(|e| element_matches(e, elem_cond))
                    })
                })
        }
        _ => field_matches(record.get(key), cond),
    })
}

fn element_matches(
    element: &serde_json::Map<String, Value>,
    conditions: &serde_json::Map<String, Value>,
) -> bool {
    conditions.iter().all(|(key, cond)| match key.as_str() {
        "$or" => cond.as_array().is_some_and(|branches| {
            branches.iter().any(|branch| {
                branch
                    .as_object()
                    .is_some_and(|b| element_matches(element, b))
            })
        }),
        _ => field_matches(element.get(key), cond),
    })
}

fn field_matches(stored: Option<&Value>, cond: &Value) -> bool {
    if let Some(ops) = cond.as_object() {
        let is_operator_clause =
            ops.contains_key("$in") || ops.contains_key("$exists") || ops.contains_key("$all");
        if is_operator_clause {
            return ops.iter().all(|(op, arg)| match op.as_str() {
                "$in" => arg
                    .as_array()
                    .is_some_and(|wanted| wanted.iter().any(|v| value_matches(stored, v))),
                "$exists" => arg.as_bool().is_some_and(|want| stored.is_some() == want),
                "$all" => arg
                    .as_array()
                    .is_some_and(|wanted| wanted.iter().all(|v| value_matches(stored, v))),
                _ => false,
            });
        }
    }
    value_matches(stored, cond)
}

/// Equality with array-containment semantics: an array-valued field
/// matches when any of its members equals the expected value
fn value_matches(stored: Option<&Value>, expected: &Value) -> bool {
    match stored {
        None => false,
        Some(Value::Array(items)) => {
            items.iter().any(|item| item == expected)
                || expected.as_array().is_some_and(|wanted| wanted == items)
        }
        Some(value) => value == expected,
    }
}

/// True when a record satisfies conditional-update criteria
pub fn criteria_match(record: &StorageRecord, criteria: &UpdateCriteria) -> bool {
    if record.get(FIELD_ID).and_then(|v| v.as_str()) != Some(criteria.id.as_str()) {
        return false;
    }
    if let Some(expected) = criteria.modification_count {
        if record.get(FIELD_MODIFICATION_COUNT).and_then(|v| v.as_i64()) != Some(expected) {
            return false;
        }
    }
    if let Some(subject_id) = &criteria.subject_id {
        if find_subject(record, subject_id).is_none() {
            return false;
        }
    }
    true
}

fn find_subject(record: &StorageRecord, subject_id: &str) -> Option<usize> {
    record
        .get(FIELD_GRAPH)
        .and_then(|g| g.as_array())
        .and_then(|graph| {
            graph.iter().position(|element| {
                element.get(FIELD_URL).and_then(|v| v.as_str()) == Some(subject_id)
            })
        })
}

/// Apply an update spec to a record whose criteria already matched.
/// Positional subject updates target the element identified by
/// `criteria.subject_id`.
pub fn apply_update(record: &mut StorageRecord, criteria: &UpdateCriteria, update: &UpdateSpec) {
    if update.increment_modification_count != 0 {
        let count = record
            .get(FIELD_MODIFICATION_COUNT)
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        record.insert(
            FIELD_MODIFICATION_COUNT.to_string(),
            json!(count + update.increment_modification_count),
        );
    }

    for (field, value) in &update.set_fields {
        record.insert(field.clone(), value.clone());
    }

    if !update.pull_subjects.is_empty() {
        if let Some(graph) = record.get_mut(FIELD_GRAPH).and_then(|g| g.as_array_mut()) {
            graph.retain(|element| {
                element
                    .get(FIELD_URL)
                    .and_then(|v| v.as_str())
                    .map(|id| !update.pull_subjects.iter().any(|pulled| pulled == id))
                    .unwrap_or(true)
            });
        }
    }

    let has_positional =
        !update.set_subject_fields.is_empty() || !update.unset_subject_fields.is_empty();
    if has_positional {
        if let Some(subject_id) = &criteria.subject_id {
            if let Some(index) = find_subject(record, subject_id) {
                if let Some(element) = record
                    .get_mut(FIELD_GRAPH)
                    .and_then(|g| g.as_array_mut())
                    .and_then(|graph| graph.get_mut(index))
                    .and_then(|e| e.as_object_mut())
                {
                    for (field, value) in &update.set_subject_fields {
                        element.insert(field.clone(), value.clone());
                    }
                    for field in &update.unset_subject_fields {
                        element.remove(field);
                    }
                }
            }
        }
    }

    if let Some(subject) = &update.push_subject {
        match record.get_mut(FIELD_GRAPH).and_then(|g| g.as_array_mut()) {
            Some(graph) => graph.push(subject.clone()),
            None => {
                record.insert(FIELD_GRAPH.to_string(), json!([subject]));
            }
        }
    }

    if let Some(history_url) = &update.push_history {
        match record.get_mut(FIELD_HISTORY).and_then(|h| h.as_array_mut()) {
            Some(history) => history.push(json!(history_url)),
            None => {
                record.insert(FIELD_HISTORY.to_string(), json!([history_url]));
            }
        }
    }
}

/// Sort records by a predicate field path. The key for each record is
/// the first value of the field found in any `@graph` element (first
/// member for array-valued fields); records without the field sort
/// last regardless of direction.
pub fn sort_records(records: &mut [StorageRecord], field: &str, direction: SortDirection) {
    records.sort_by(|a, b| {
        match (sort_key(a, field), sort_key(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(ka), Some(kb)) => {
                let ordering = compare_values(&ka, &kb);
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }
        }
    });
}

fn sort_key(record: &StorageRecord, field: &str) -> Option<Value> {
    let graph = record.get(FIELD_GRAPH)?.as_array()?;
    for element in graph {
        if let Some(value) = element.get(field) {
            return match value {
                Value::Array(items) => items.first().cloned(),
                other => Some(other.clone()),
            };
        }
    }
    None
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(body: Value) -> StorageRecord {
        body.as_object().cloned().expect("object literal")
    }

    #[test]
    fn test_elem_match_with_id_pin() {
        let rec = record(json!({
            "_id": "1.1",
            "@graph": [
                { "@id": "urn:stratum:/t/ns/1.1", "p": "x" },
                { "@id": "urn:stratum:/t/ns/1.1/sub", "p": "y" },
            ],
        }));
        let hit = json!({ "@graph": { "$elemMatch": { "@id": "urn:stratum:/t/ns/1.1/sub", "p": "y" } } });
        let miss = json!({ "@graph": { "$elemMatch": { "@id": "urn:stratum:/t/ns/1.1", "p": "y" } } });
        assert!(record_matches(&rec, &hit));
        assert!(!record_matches(&rec, &miss));
    }

    #[test]
    fn test_array_containment_and_operators() {
        let rec = record(json!({
            "_id": "1.1",
            "@graph": [ { "@id": "s", "p": ["a", "b"], "q": 5 } ],
        }));
        assert!(record_matches(&rec, &json!({ "@graph": { "$elemMatch": { "p": "a" } } })));
        assert!(record_matches(
            &rec,
            &json!({ "@graph": { "$elemMatch": { "p": { "$all": ["a", "b"] } } } })
        ));
        assert!(!record_matches(
            &rec,
            &json!({ "@graph": { "$elemMatch": { "p": { "$all": ["a", "c"] } } } })
        ));
        assert!(record_matches(
            &rec,
            &json!({ "@graph": { "$elemMatch": { "q": { "$in": [4, 5] } } } })
        ));
        assert!(record_matches(
            &rec,
            &json!({ "@graph": { "$elemMatch": { "missing": { "$exists": false } } } })
        ));
        assert!(record_matches(
            &rec,
            &json!({ "@graph": { "$elemMatch": { "$or": [ { "p": "z" }, { "q": 5 } ] } } })
        ));
    }

    #[test]
    fn test_top_level_in_clause() {
        let rec = record(json!({ "_id": "h.1", "@id": "urn:stratum:/t/h/h.1" }));
        assert!(record_matches(
            &rec,
            &json!({ "@id": { "$in": ["urn:stratum:/t/h/h.1", "urn:stratum:/t/h/h.2"] } })
        ));
    }

    #[test]
    fn test_criteria_and_positional_update() {
        let mut rec = record(json!({
            "_id": "1.1",
            "_modificationCount": 2,
            "@graph": [ { "@id": "s1", "p": "old" }, { "@id": "s2" } ],
        }));

        let criteria = UpdateCriteria {
            id: "1.1".into(),
            modification_count: Some(2),
            subject_id: Some("s1".into()),
        };
        assert!(criteria_match(&rec, &criteria));

        let stale = UpdateCriteria {
            modification_count: Some(5),
            ..criteria.clone()
        };
        assert!(!criteria_match(&rec, &stale));

        let mut set_subject_fields = serde_json::Map::new();
        set_subject_fields.insert("p".to_string(), json!("new"));
        let update = UpdateSpec {
            increment_modification_count: 1,
            set_subject_fields,
            unset_subject_fields: vec!["gone".to_string()],
            push_history: Some("http://h/t/ns_history/9.1".to_string()),
            ..Default::default()
        };
        apply_update(&mut rec, &criteria, &update);

        assert_eq!(rec.get("_modificationCount"), Some(&json!(3)));
        assert_eq!(rec["@graph"][0]["p"], json!("new"));
        assert_eq!(rec["_history"], json!(["http://h/t/ns_history/9.1"]));
    }

    #[test]
    fn test_pull_and_push_subjects() {
        let mut rec = record(json!({
            "_id": "1.1",
            "@graph": [ { "@id": "s1" }, { "@id": "s2" } ],
        }));
        let criteria = UpdateCriteria::for_id("1.1");
        apply_update(
            &mut rec,
            &criteria,
            &UpdateSpec {
                pull_subjects: vec!["s1".to_string()],
                push_subject: Some(json!({ "@id": "s3", "p": 1 })),
                ..Default::default()
            },
        );
        let graph = rec["@graph"].as_array().unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[0]["@id"], json!("s2"));
        assert_eq!(graph[1]["@id"], json!("s3"));
    }

    #[test]
    fn test_sort_numbers_missing_last() {
        let mut records = vec![
            record(json!({ "_id": "a", "@graph": [ { "@id": "s", "rank": 3 } ] })),
            record(json!({ "_id": "b", "@graph": [ { "@id": "s" } ] })),
            record(json!({ "_id": "c", "@graph": [ { "@id": "s", "rank": [1, 9] } ] })),
        ];
        sort_records(&mut records, "rank", SortDirection::Ascending);
        let ids: Vec<_> = records.iter().map(|r| r["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        sort_records(&mut records, "rank", SortDirection::Descending);
        let ids: Vec<_> = records.iter().map(|r| r["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }
}
