//! Flat property maps stored on graph nodes.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Property map of a single node.
pub type Properties = Map<String, Value>;

/// Property holding a decision's embedding vector.
pub const EMBEDDING_KEY: &str = "embedding";

/// Converts an arbitrary JSON value into storable node properties.
///
/// Graph properties must be primitives or homogeneous lists of primitives, so
/// nested objects and any list that is not all booleans, all numbers or all
/// strings are stored as JSON-encoded strings. `null` values are kept; stores
/// treat them as property removal.
///
/// # Errors
///
/// Returns [`Error::InvalidProperties`] when `value` is not a JSON object.
pub fn normalize_properties(value: Value) -> Result<Properties> {
    let Value::Object(map) = value else {
        return Err(Error::InvalidProperties {
            reason: "payload must be a JSON object".into(),
        });
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| (key, normalize_value(value)))
        .collect())
}

fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(_) => Value::String(value.to_string()),
        Value::Array(items) if !is_homogeneous(&items) => {
            Value::String(Value::Array(items).to_string())
        }
        other => other,
    }
}

fn is_homogeneous(items: &[Value]) -> bool {
    items.iter().all(Value::is_boolean)
        || items.iter().all(Value::is_number)
        || items.iter().all(Value::is_string)
}

/// Returns a copy of `props` suitable for API responses.
///
/// Embeddings are internal search state and are never echoed back.
#[must_use]
pub fn public_properties(props: &Properties) -> Properties {
    props
        .iter()
        .filter(|(key, _)| key.as_str() != EMBEDDING_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
