//! Value encoding between the abstract model and storage JSON
//!
//! Plain literals (strings, and numbers/booleans carrying their
//! canonical XSD datatype) are stored as bare JSON scalars; everything
//! else is stored as a tagged struct `{"type": ..., "value": ...}` so
//! no information is lost on the way back out.

use serde_json::json;
use stratum_core_types::{vocab::XSD, HostContext};

use crate::errors::Result;
use crate::model::Value;

use super::urls::{canonicalize_url, restore_url};

fn xsd(name: &str) -> String {
    format!("{}{}", XSD, name)
}

/// Encode one value for storage
pub fn value_to_storage(
    value: &Value,
    host: &HostContext,
    base_url: &str,
) -> Result<serde_json::Value> {
    match value {
        Value::Reference(url) => Ok(json!({
            "type": "uri",
            "value": canonicalize_url(url, host, base_url)?,
        })),
        Value::Blank(id) => Ok(json!({ "type": "bnode", "value": id })),
        Value::Literal { value, datatype } => {
            let plain = match datatype.as_deref() {
                None => value.is_string(),
                Some(dt) if dt == xsd("boolean") => value.is_boolean(),
                Some(dt) if dt == xsd("integer") => value.is_i64() || value.is_u64(),
                Some(dt) if dt == xsd("double") => value.is_f64(),
                _ => false,
            };
            if plain {
                return Ok(value.clone());
            }
            match datatype {
                Some(dt) => Ok(json!({ "type": "literal", "value": value, "datatype": dt })),
                None => Ok(json!({ "type": "literal", "value": value })),
            }
        }
    }
}

/// Decode one stored value back into the abstract model
pub fn value_from_storage(stored: &serde_json::Value, host: &HostContext) -> Value {
    match stored {
        serde_json::Value::Object(map) => {
            let tag = map.get("type").and_then(|t| t.as_str());
            let value = map.get("value").cloned().unwrap_or(serde_json::Value::Null);
            match tag {
                Some("uri") => {
                    let url = value.as_str().unwrap_or_default();
                    Value::Reference(restore_url(url, host))
                }
                Some("bnode") => Value::Blank(value.as_str().unwrap_or_default().to_string()),
                _ => Value::Literal {
                    value,
                    datatype: map
                        .get("datatype")
                        .and_then(|d| d.as_str())
                        .map(str::to_string),
                },
            }
        }
        serde_json::Value::Bool(_) => Value::Literal {
            value: stored.clone(),
            datatype: Some(xsd("boolean")),
        },
        serde_json::Value::Number(n) => Value::Literal {
            value: stored.clone(),
            datatype: Some(if n.is_f64() { xsd("double") } else { xsd("integer") }),
        },
        _ => Value::Literal {
            value: stored.clone(),
            datatype: None,
        },
    }
}
