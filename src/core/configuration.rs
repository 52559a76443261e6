//! Deep merge of per-instance configuration objects.
//!
//! - objects merge key by key, recursively
//! - arrays concatenate (re-applying the same partial duplicates entries)
//! - anything else overwrites

use serde_json::{Map, Value};

use crate::error::Error;

/// Merges `partial` into `target`.
pub(crate) fn merge(target: &mut Map<String, Value>, partial: Map<String, Value>) {
    for (key, incoming) in partial {
        let slot = target.entry(key).or_insert(Value::Null);
        merge_value(slot, incoming);
    }
}

fn merge_value(slot: &mut Value, incoming: Value) {
    match (slot, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => merge(existing, incoming),
        (Value::Array(existing), Value::Array(incoming)) => existing.extend(incoming),
        (slot, incoming) => *slot = incoming,
    }
}

/// Accepts only JSON objects as configuration partials.
pub(crate) fn as_partial(value: Value) -> Result<Map<String, Value>, Error> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Configuration {
            reason: format!("expected an object, got {}", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
