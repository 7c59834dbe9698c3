// Integration tests for the SQLite backend
// The backend contract must behave identically to the memory backend;
// these tests additionally cover durability across re-opens.

use std::sync::Arc;

use stratum_core::model::{SubjectPatch, SubjectUpdates, Value};
use stratum_core::Document;
use stratum_core_types::{CollectionKey, HostContext};
use stratum_store::{DocumentService, SqliteBackend};
use tempfile::TempDir;

const ACTOR: &str = "http://users.example/alice";
const TITLE: &str = "http://purl.org/dc/terms/title";

fn key() -> CollectionKey {
    CollectionKey::new("acme", "tasks")
}

fn host() -> HostContext {
    HostContext::new("h.test")
}

fn new_doc(title: &str) -> Document {
    let mut doc = Document::new("");
    doc.add_value("", TITLE, Value::string(title));
    doc
}

fn set_title(subject: &str, title: &str) -> SubjectUpdates {
    let mut updates = SubjectUpdates::new();
    updates.insert(
        subject.to_string(),
        SubjectPatch::set_one(TITLE, vec![Value::string(title)]),
    );
    updates
}

#[test]
fn test_full_lifecycle_in_memory_database() {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let svc = DocumentService::new(backend, 100);

    let (url, stored) = svc
        .create_document(ACTOR, &new_doc("first"), &host(), &key(), None)
        .unwrap();
    assert_eq!(stored.meta.modification_count, 0);

    let id = url.rsplit('/').next().unwrap();
    let next = svc
        .patch_document(ACTOR, 0, &set_title(&url, "second"), &host(), &key(), id)
        .unwrap();
    assert_eq!(next, 1);

    let err = svc
        .patch_document(ACTOR, 0, &set_title(&url, "third"), &host(), &key(), id)
        .unwrap_err();
    assert_eq!(err.code(), "ERR_CONFLICT");

    let doc = svc.get_document(ACTOR, &host(), &key(), id).unwrap();
    assert_eq!(doc.meta.modification_count, 1);
    assert_eq!(doc.values(&url, TITLE), &[Value::string("second")]);
    assert_eq!(doc.meta.history.len(), 1);
}

#[test]
fn test_duplicate_id_maps_to_the_typed_error() {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let svc = DocumentService::new(backend, 100);
    svc.create_document(ACTOR, &new_doc("a"), &host(), &key(), Some("t1"))
        .unwrap();
    let err = svc
        .create_document(ACTOR, &new_doc("b"), &host(), &key(), Some("t1"))
        .unwrap_err();
    assert_eq!(err.code(), "ERR_DUPLICATE_ID");
}

#[test]
fn test_documents_and_history_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stratum.db");

    let (url, history) = {
        let backend = Arc::new(SqliteBackend::open(&path).unwrap());
        let svc = DocumentService::new(backend, 100);
        let (url, _) = svc
            .create_document(ACTOR, &new_doc("first"), &host(), &key(), Some("t1"))
            .unwrap();
        svc.patch_document(ACTOR, 0, &set_title(&url, "second"), &host(), &key(), "t1")
            .unwrap();
        let doc = svc.get_document(ACTOR, &host(), &key(), "t1").unwrap();
        (url, doc.meta.history)
    };

    // a fresh process over the same file sees everything
    let backend = Arc::new(SqliteBackend::open(&path).unwrap());
    let svc = DocumentService::new(backend, 100);

    let doc = svc.get_document(ACTOR, &host(), &key(), "t1").unwrap();
    assert_eq!(doc.meta.modification_count, 1);
    assert_eq!(doc.values(&url, TITLE), &[Value::string("second")]);

    let versions = svc
        .get_prior_versions(ACTOR, &host(), &key(), &history)
        .unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].values(&url, TITLE), &[Value::string("first")]);

    // the lineage counter also survives: new ids never collide with
    // ids minted by the previous process
    let (new_url, _) = svc
        .create_document(ACTOR, &new_doc("third"), &host(), &key(), None)
        .unwrap();
    assert_ne!(new_url, url);
}
