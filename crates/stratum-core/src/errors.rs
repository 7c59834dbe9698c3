use thiserror::Error;

/// Result type alias using StratumError
pub type Result<T> = std::result::Result<T, StratumError>;

/// Canonical error taxonomy for store operations
///
/// Each variant maps to a stable error code usable for programmatic
/// handling, testing, and external API responses. `Conflict` and
/// `NotFound` are deliberately distinct so callers can decide between
/// re-fetch-and-retry (Conflict) and treating the resource as gone
/// (NotFound).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StratumError {
    /// No document with that id in the collection
    #[error("Document not found: {id}")]
    NotFound { id: String },

    /// Modification-count mismatch on patch
    #[error("Conflict on {id}: expected modification count {expected}")]
    Conflict { id: String, expected: i64 },

    /// Reserved system predicate write, malformed modification count,
    /// or an unresolvable resource reference
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// Id collision on create
    #[error("Duplicate document id: {id}")]
    DuplicateId { id: String },

    /// The backing store cannot be reached
    #[error("Backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// Storage record encoding/decoding failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal invariant breach
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StratumError {
    /// Get the stable error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            StratumError::NotFound { .. } => "ERR_NOT_FOUND",
            StratumError::Conflict { .. } => "ERR_CONFLICT",
            StratumError::Validation { .. } => "ERR_VALIDATION",
            StratumError::DuplicateId { .. } => "ERR_DUPLICATE_ID",
            StratumError::BackendUnavailable { .. } => "ERR_BACKEND_UNAVAILABLE",
            StratumError::Serialization { .. } => "ERR_SERIALIZATION",
            StratumError::Internal { .. } => "ERR_INTERNAL",
        }
    }

    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        StratumError::Validation {
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        StratumError::NotFound { id: id.into() }
    }

    /// Create a conflict error
    pub fn conflict(id: impl Into<String>, expected: i64) -> Self {
        StratumError::Conflict {
            id: id.into(),
            expected,
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for StratumError {
    fn from(err: serde_json::Error) -> Self {
        StratumError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let cases = [
            (StratumError::not_found("x"), "ERR_NOT_FOUND"),
            (StratumError::conflict("x", 3), "ERR_CONFLICT"),
            (StratumError::validation("nope"), "ERR_VALIDATION"),
            (
                StratumError::DuplicateId { id: "1.1".into() },
                "ERR_DUPLICATE_ID",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.code(), expected, "wrong code for {:?}", err);
        }
    }

    #[test]
    fn test_conflict_distinct_from_not_found() {
        assert_ne!(
            StratumError::conflict("a", 0).code(),
            StratumError::not_found("a").code()
        );
    }
}
