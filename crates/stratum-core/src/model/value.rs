//! Typed property values
//!
//! A predicate maps to one or more values. Values are a closed variant:
//! resource references, blank-node references, and literals with an
//! optional datatype. Literal payloads are JSON scalars (string, number,
//! boolean); richer datatypes ride along as an explicit datatype URL.

use serde::{Deserialize, Serialize};
use stratum_core_types::vocab::XSD;

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Reference to another resource by URL
    Reference(String),
    /// Reference to a blank node by local id (`_:` prefixed)
    Blank(String),
    /// Literal payload with optional datatype
    Literal {
        value: serde_json::Value,
        datatype: Option<String>,
    },
}

impl Value {
    pub fn reference(url: impl Into<String>) -> Self {
        Value::Reference(url.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Literal {
            value: serde_json::Value::String(s.into()),
            datatype: None,
        }
    }

    pub fn integer(n: i64) -> Self {
        Value::Literal {
            value: serde_json::Value::from(n),
            datatype: Some(format!("{}integer", XSD)),
        }
    }

    pub fn boolean(b: bool) -> Self {
        Value::Literal {
            value: serde_json::Value::Bool(b),
            datatype: Some(format!("{}boolean", XSD)),
        }
    }

    pub fn typed_literal(value: serde_json::Value, datatype: impl Into<String>) -> Self {
        Value::Literal {
            value,
            datatype: Some(datatype.into()),
        }
    }

    /// Reference URL, if this is a reference value
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Value::Reference(url) => Some(url),
            _ => None,
        }
    }

    /// Literal payload, if this is a literal value
    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Literal { value, .. } => Some(value),
            _ => None,
        }
    }
}
