//! stratum-core - document model, translation, and query compilation
//!
//! Provides:
//! - The abstract property-graph document model (`model`)
//! - The canonical error taxonomy (`errors`)
//! - The Value/Query Translator between the abstract model and the
//!   backend storage encoding (`translate`)
//! - The abstract query model (`query`)
//! - The structured logging facility (`logging`)
//!
//! Everything in this crate is stateless; persistence lives in
//! `stratum-store`.

pub mod errors;
pub mod logging;
pub mod model;
pub mod query;
pub mod translate;

pub use errors::{Result, StratumError};
pub use model::{ChangeEntry, ChangeKind, Document, SubjectNode, SystemMetadata, Value};
