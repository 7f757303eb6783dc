//! Value predicates used by target normalization.
//!
//! Navigation data arrives as [`serde_json::Value`]. Structural copies are
//! plain [`Clone`]: a cloned `Value` owns all of its nested arrays and maps, so
//! history entries never alias caller data.

use serde_json::Value;

/// `true` for JSON arrays.
pub fn is_sequence(value: &Value) -> bool {
    matches!(value, Value::Array(_))
}

/// `true` for JSON objects.
pub fn is_mapping(value: &Value) -> bool {
    matches!(value, Value::Object(_))
}

/// Emptiness as query encoding understands it.
///
/// Empty arrays, empty objects, `null`, and strings that are blank after
/// trimming are empty. Numbers and booleans never are.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
