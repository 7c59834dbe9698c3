// Integration tests for query execution over the document store

use std::sync::Arc;

use stratum_core::model::Value;
use stratum_core::query::{Constraint, Query, SortDirection, SubjectClause};
use stratum_core::Document;
use stratum_core_types::{CollectionKey, HostContext};
use stratum_store::{DocumentService, MemoryBackend};

const ACTOR: &str = "http://users.example/alice";
const TITLE: &str = "http://purl.org/dc/terms/title";
const RANK: &str = "http://vocab.test/ns#rank";
const TAG: &str = "http://vocab.test/ns#tag";
const OWNER: &str = "http://vocab.test/ns#owner";

fn key() -> CollectionKey {
    CollectionKey::new("acme", "tasks")
}

fn host() -> HostContext {
    HostContext::new("h.test")
}

// Three documents: t1 (rank 2, tags x+y, owned sub-resource), t2
// (rank 1, tag x), t3 (no rank, no tags)
fn seeded_service() -> DocumentService {
    let svc = DocumentService::new(Arc::new(MemoryBackend::new()), 100);

    let mut t1 = Document::new("");
    t1.add_value("", TITLE, Value::string("alpha"));
    t1.add_value("", RANK, Value::integer(2));
    t1.add_value("", TAG, Value::string("x"));
    t1.add_value("", TAG, Value::string("y"));
    t1.add_value(
        "http://h.test/acme/tasks/t1/parts/1",
        OWNER,
        Value::reference("http://h.test/acme/tasks/t1"),
    );
    svc.create_document(ACTOR, &t1, &host(), &key(), Some("t1"))
        .unwrap();

    let mut t2 = Document::new("");
    t2.add_value("", TITLE, Value::string("beta"));
    t2.add_value("", RANK, Value::integer(1));
    t2.add_value("", TAG, Value::string("x"));
    svc.create_document(ACTOR, &t2, &host(), &key(), Some("t2"))
        .unwrap();

    let mut t3 = Document::new("");
    t3.add_value("", TITLE, Value::string("gamma"));
    svc.create_document(ACTOR, &t3, &host(), &key(), Some("t3"))
        .unwrap();

    svc
}

fn urls(results: &[Document]) -> Vec<&str> {
    results.iter().map(|d| d.url.as_str()).collect()
}

#[test]
fn test_exact_match_in_any_subject() {
    let svc = seeded_service();
    let query = Query::new().any_subject(
        SubjectClause::new().with(TITLE, Constraint::Equals(Value::string("alpha"))),
    );
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(urls(&results), ["http://h.test/acme/tasks/t1"]);
}

#[test]
fn test_no_match_yields_an_empty_list() {
    let svc = seeded_service();
    let query = Query::new().any_subject(
        SubjectClause::new().with(TITLE, Constraint::Equals(Value::string("delta"))),
    );
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_subject_pinned_clause_only_matches_that_subject() {
    let svc = seeded_service();
    // the owner predicate lives on a sub-resource subject of t1
    let query = Query::new().subject(
        "http://h.test/acme/tasks/t1/parts/1",
        SubjectClause::new().with(OWNER, Constraint::Exists(true)),
    );
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(urls(&results), ["http://h.test/acme/tasks/t1"]);

    // pinning the same constraint to the primary subject matches nothing
    let query = Query::new().subject(
        "http://h.test/acme/tasks/t1",
        SubjectClause::new().with(OWNER, Constraint::Exists(true)),
    );
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_reference_values_match_across_canonicalization() {
    let svc = seeded_service();
    let query = Query::new().any_subject(SubjectClause::new().with(
        OWNER,
        Constraint::Equals(Value::reference("http://h.test/acme/tasks/t1")),
    ));
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(urls(&results), ["http://h.test/acme/tasks/t1"]);
}

#[test]
fn test_any_of_constraint() {
    let svc = seeded_service();
    let query = Query::new().any_subject(SubjectClause::new().with(
        TITLE,
        Constraint::AnyOf(vec![Value::string("alpha"), Value::string("beta")]),
    ));
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_all_constraint_requires_every_value() {
    let svc = seeded_service();
    let query = Query::new().any_subject(SubjectClause::new().with(
        TAG,
        Constraint::All(vec![Value::string("x"), Value::string("y")]),
    ));
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(urls(&results), ["http://h.test/acme/tasks/t1"]);

    // a single-valued constraint matches by containment
    let query = Query::new()
        .any_subject(SubjectClause::new().with(TAG, Constraint::Equals(Value::string("x"))));
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_exists_false_matches_absence() {
    let svc = seeded_service();
    let query = Query::new()
        .any_subject(SubjectClause::new().with(RANK, Constraint::Exists(false)));
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    // matches any subject node without the predicate, which includes
    // t1's sub-resource and all of t3's subjects
    assert!(urls(&results).contains(&"http://h.test/acme/tasks/t3"));
}

#[test]
fn test_two_branch_or() {
    let svc = seeded_service();
    let query = Query::new().any_subject(SubjectClause::new().either(
        (TITLE, Constraint::Equals(Value::string("gamma"))),
        (RANK, Constraint::Equals(Value::integer(2))),
    ));
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_order_by_sorts_results() {
    let svc = seeded_service();
    let query = Query::new()
        .any_subject(SubjectClause::new().with(TITLE, Constraint::Exists(true)))
        .order_by(RANK, SortDirection::Ascending);
    let results = svc.execute_query(ACTOR, &query, &host(), &key()).unwrap();
    // rank 1, rank 2, then the document without a rank
    assert_eq!(
        urls(&results),
        [
            "http://h.test/acme/tasks/t2",
            "http://h.test/acme/tasks/t1",
            "http://h.test/acme/tasks/t3",
        ]
    );
}
