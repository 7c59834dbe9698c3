// Round-trip property: from_storage(to_storage(d)) == d, up to
// value-ordering-insensitive equality of predicate value sequences.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use stratum_core::model::{Document, Value};
use stratum_core::translate::{from_storage, to_storage};
use stratum_core_types::HostContext;

fn host() -> HostContext {
    HostContext::new("h.test")
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Value::string),
        any::<i64>().prop_map(Value::integer),
        any::<bool>().prop_map(Value::boolean),
        // exotic datatype literals keep their tagged struct form
        "[a-z]{1,8}".prop_map(|s| Value::typed_literal(
            serde_json::Value::String(s),
            "http://www.w3.org/2001/XMLSchema#dateTime",
        )),
        // same-origin references get canonicalized and restored
        "[a-z0-9]{1,6}".prop_map(|p| Value::reference(format!("http://h.test/acme/tasks/{}", p))),
        // cross-origin references pass through untouched
        "[a-z0-9]{1,6}".prop_map(|p| Value::reference(format!("http://other.example/{}", p))),
        "[a-z0-9]{1,6}".prop_map(|b| Value::Blank(format!("_:{}", b))),
    ]
}

fn arb_predicate() -> impl Strategy<Value = String> {
    // namespaces with dots exercise the field-path escaping rule
    "[a-z]{1,6}".prop_map(|p| format!("http://vocab.test/ns#{}", p))
}

fn arb_document() -> impl Strategy<Value = Document> {
    let subject_node = btree_map(arb_predicate(), vec(arb_value(), 1..3), 1..4);
    ("[a-z0-9]{1,6}", btree_map("[a-z0-9]{1,6}", subject_node, 0..3)).prop_map(
        |(doc_id, extra_subjects)| {
            let url = format!("http://h.test/acme/tasks/{}", doc_id);
            let mut doc = Document::new(&url);
            doc.subjects.insert(url.clone(), Default::default());
            for (suffix, node) in extra_subjects {
                doc.subjects
                    .insert(format!("http://h.test/acme/tasks/{}", suffix), node);
            }
            doc
        },
    )
}

proptest! {
    #[test]
    fn round_trip_preserves_documents(doc in arb_document()) {
        let record = to_storage(&doc, &host(), &doc.url).unwrap();
        let restored = from_storage(&record, &host()).unwrap();
        prop_assert!(
            restored.equals_ignoring_value_order(&doc),
            "restored {:#?} != original {:#?}", restored, doc
        );
    }

    #[test]
    fn canonical_form_never_leaks_the_origin(doc in arb_document()) {
        let record = to_storage(&doc, &host(), &doc.url).unwrap();
        let rendered = serde_json::to_string(&record).unwrap();
        // the host must only appear inside cross-origin URLs, never for
        // same-origin subject ids
        let graph = record.get("@graph").and_then(|g| g.as_array()).unwrap();
        for element in graph {
            let id = element.get("@id").and_then(|v| v.as_str()).unwrap();
            prop_assert!(id.starts_with("urn:stratum:/"), "subject id not canonical: {}", id);
        }
        prop_assert!(!rendered.contains("http://h.test/acme"), "origin leaked: {}", rendered);
    }
}
