//! Core types shared across stratum facilities
//!
//! This crate provides foundational types used by the translator, the
//! document store, and the change feed:
//!
//! - **Context types**: CollectionKey, HostContext
//! - **Vocabulary**: namespace constants and reserved system predicates

pub mod context;
pub mod vocab;

pub use context::{CollectionKey, HostContext};
