//! Error handling for stratum-store
//!
//! Wraps the stratum-core error taxonomy with store-specific helpers

use stratum_core::StratumError;

/// Result type alias using StratumError
pub type Result<T> = stratum_core::Result<T>;

/// Create a backend-unavailable error
pub fn backend_unavailable(reason: impl Into<String>) -> StratumError {
    StratumError::BackendUnavailable {
        reason: reason.into(),
    }
}

/// Create an internal error for a failed backend operation
pub fn backend_error(operation: &str, err: impl std::fmt::Display) -> StratumError {
    StratumError::Internal {
        message: format!("{}: {}", operation, err),
    }
}

/// Create a serialization error for a malformed stored record
pub fn record_decode_error(collection: &str, err: impl std::fmt::Display) -> StratumError {
    StratumError::Serialization {
        message: format!("bad record in '{}': {}", collection, err),
    }
}
