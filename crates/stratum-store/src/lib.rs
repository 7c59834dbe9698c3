//! stratum-store - persistence layer over an atomic document backend
//!
//! Provides:
//! - The `DocumentBackend` capability trait with in-memory and SQLite
//!   implementations
//! - The versioned `DocumentStore` (create/get/delete/patch/query) with
//!   optimistic concurrency and history capture
//! - The `HistoryArchive` of pre-mutation snapshots
//! - The `ChangeFeedBuilder` maintaining per-collection tracked
//!   resource sets
//! - The `DocumentService` facade wiring it all together, constructed
//!   once per process from `StoreConfig`

pub mod backend;
pub mod config;
pub mod documents;
pub mod errors;
pub mod feed;
pub mod history;
pub mod idgen;
pub mod service;

pub use backend::{DocumentBackend, MemoryBackend, SqliteBackend};
pub use config::{BackendKind, StoreConfig};
pub use documents::DocumentStore;
pub use errors::Result;
pub use feed::ChangeFeedBuilder;
pub use service::DocumentService;
