//! SQLite document backend
//!
//! Records are stored as JSON bodies in one `documents` table keyed by
//! (collection, id). Conditional updates run inside a transaction over
//! a mutex-guarded connection, which supplies the per-record
//! atomicity the backend contract requires. Filter evaluation happens
//! in-process through `backend::matching`, the same evaluator the
//! memory backend uses.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use stratum_core::translate::{StorageFilter, StorageRecord, FIELD_ID};
use stratum_core::StratumError;

use crate::errors::{backend_error, backend_unavailable, record_decode_error, Result};

use super::matching::{apply_update, criteria_match, record_matches, sort_records};
use super::{record_id, DocumentBackend, UpdateCriteria, UpdateSpec};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
CREATE TABLE IF NOT EXISTS counters (
    name  TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

/// SQLite-backed document backend
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| backend_unavailable(format!("sqlite open: {}", e)))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| backend_unavailable(format!("sqlite open: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL")
            .map_err(|e| backend_error("sqlite_configure", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| backend_error("sqlite_schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| backend_error("sqlite_lock", e))
    }

    fn decode(collection: &str, body: String) -> Result<StorageRecord> {
        serde_json::from_str::<serde_json::Value>(&body)
            .map_err(|e| record_decode_error(collection, e))?
            .as_object()
            .cloned()
            .ok_or_else(|| record_decode_error(collection, "body is not a JSON object"))
    }

    fn encode(record: &StorageRecord) -> Result<String> {
        serde_json::to_string(record).map_err(|e| backend_error("sqlite_encode", e))
    }
}

impl DocumentBackend for SqliteBackend {
    fn insert(&self, collection: &str, record: StorageRecord) -> Result<()> {
        let id = record_id(&record)?;
        let body = Self::encode(&record)?;
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection, id, body],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StratumError::DuplicateId { id })
            }
            Err(e) => Err(backend_error("sqlite_insert", e)),
        }
    }

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<StorageRecord>> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| backend_error("sqlite_find_by_id", e))?;
        body.map(|b| Self::decode(collection, b)).transpose()
    }

    fn find(&self, collection: &str, filter: &StorageFilter) -> Result<Vec<StorageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")
            .map_err(|e| backend_error("sqlite_find", e))?;
        let bodies = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))
            .map_err(|e| backend_error("sqlite_find", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| backend_error("sqlite_find", e))?;

        let mut results = Vec::new();
        for body in bodies {
            let record = Self::decode(collection, body)?;
            if record_matches(&record, &filter.criteria) {
                results.push(record);
            }
        }
        if let Some((field, direction)) = &filter.sort {
            sort_records(&mut results, field, *direction);
        }
        Ok(results)
    }

    fn update_one(
        &self,
        collection: &str,
        criteria: &UpdateCriteria,
        update: &UpdateSpec,
    ) -> Result<u64> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| backend_error("sqlite_update", e))?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, criteria.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| backend_error("sqlite_update", e))?;

        let Some(body) = body else {
            return Ok(0);
        };
        let mut record = Self::decode(collection, body)?;
        if !criteria_match(&record, criteria) {
            return Ok(0);
        }
        apply_update(&mut record, criteria, update);

        tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection, criteria.id, Self::encode(&record)?],
        )
        .map_err(|e| backend_error("sqlite_update", e))?;
        tx.commit().map_err(|e| backend_error("sqlite_update", e))?;
        Ok(1)
    }

    fn upsert(&self, collection: &str, id: &str, mut record: StorageRecord) -> Result<()> {
        record.insert(
            FIELD_ID.to_string(),
            serde_json::Value::String(id.to_string()),
        );
        let body = Self::encode(&record)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
            params![collection, id, body],
        )
        .map_err(|e| backend_error("sqlite_upsert", e))?;
        Ok(())
    }

    fn remove(&self, collection: &str, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .map_err(|e| backend_error("sqlite_remove", e))?;
        Ok(removed > 0)
    }

    fn drop_collection(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM documents WHERE collection = ?1",
            params![collection],
        )
        .map_err(|e| backend_error("sqlite_drop", e))?;
        Ok(())
    }

    fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM documents WHERE collection = ?1 ORDER BY id")
            .map_err(|e| backend_error("sqlite_list_ids", e))?;
        let ids = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))
            .map_err(|e| backend_error("sqlite_list_ids", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| backend_error("sqlite_list_ids", e))?;
        Ok(ids)
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT collection FROM documents ORDER BY collection")
            .map_err(|e| backend_error("sqlite_collections", e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| backend_error("sqlite_collections", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| backend_error("sqlite_collections", e))?;
        Ok(names)
    }

    fn next_lineage(&self) -> Result<u64> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| backend_error("sqlite_lineage", e))?;
        tx.execute(
            "INSERT INTO counters (name, value) VALUES ('lineage', 1)
             ON CONFLICT (name) DO UPDATE SET value = value + 1",
            [],
        )
        .map_err(|e| backend_error("sqlite_lineage", e))?;
        let value: i64 = tx
            .query_row("SELECT value FROM counters WHERE name = 'lineage'", [], |row| {
                row.get(0)
            })
            .map_err(|e| backend_error("sqlite_lineage", e))?;
        tx.commit().map_err(|e| backend_error("sqlite_lineage", e))?;
        Ok(value as u64)
    }
}
