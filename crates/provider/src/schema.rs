//! JSON schema cleanup for vendors with a restricted schema dialect

use serde_json::{Map, Value};

/// Keys Gemini rejects in function parameter schemas
const UNSUPPORTED_KEYS: &[&str] = &[
    "$schema",
    "additionalProperties",
    "$id",
    "$ref",
    "$defs",
    "definitions",
];

/// Recursively drop unsupported keys, keeping array and object structure.
pub fn sanitize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !UNSUPPORTED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), sanitize_schema(value)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_schema).collect()),
        other => other.clone(),
    }
}
