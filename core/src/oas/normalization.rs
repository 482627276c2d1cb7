#![deny(missing_docs)]

//! # OpenAPI Normalization
//!
//! Rewrites compatibility spellings of schema keywords into the form the
//! schema compiler understands. Runs on the raw document before any parsing.

use serde_json::{Map, Value};

/// Keys whose values are literal data rather than schemas.
const LITERAL_KEYS: [&str; 4] = ["example", "examples", "default", "enum"];

/// Keys whose values map arbitrary names (or status codes) to objects.
const NAMED_MAP_KEYS: [&str; 9] = [
    "paths",
    "schemas",
    "parameters",
    "requestBodies",
    "responses",
    "headers",
    "content",
    "properties",
    "patternProperties",
];

/// Normalizes the whole document in place.
pub(crate) fn normalize_document(value: &mut Value) {
    normalize_node(value);
}

fn normalize_node(value: &mut Value) {
    match value {
        Value::Object(map) => {
            normalize_const(map);
            normalize_x_nullable(map);

            for (key, child) in map.iter_mut() {
                if LITERAL_KEYS.contains(&key.as_str()) {
                    continue;
                }
                if NAMED_MAP_KEYS.contains(&key.as_str()) {
                    // Keys here are names, so a property called `const` or a
                    // `default` response must not be mistaken for a keyword.
                    match child {
                        Value::Object(named) => {
                            for entry in named.values_mut() {
                                normalize_node(entry);
                            }
                        }
                        other => normalize_node(other),
                    }
                    continue;
                }
                normalize_node(child);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize_node(item);
            }
        }
        _ => {}
    }
}

/// `const: X` becomes `enum: [X]`, with an inferred `type` when none is given.
fn normalize_const(map: &mut Map<String, Value>) {
    let Some(const_val) = map.remove("const") else {
        return;
    };
    if !map.contains_key("type") {
        map.insert(
            "type".to_string(),
            Value::String(infer_schema_type(&const_val).to_string()),
        );
    }
    if !map.contains_key("enum") {
        map.insert("enum".to_string(), Value::Array(vec![const_val]));
    }
}

/// Swagger-era `x-nullable: true` becomes `nullable: true`.
fn normalize_x_nullable(map: &mut Map<String, Value>) {
    let Some(flag) = map.remove("x-nullable") else {
        return;
    };
    if !map.contains_key("nullable") {
        map.insert("nullable".to_string(), flag);
    }
}

fn infer_schema_type(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(num) if num.is_i64() || num.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_const_becomes_enum() {
        let mut doc = json!({ "schema": { "const": 3 } });
        normalize_document(&mut doc);
        assert_eq!(doc, json!({ "schema": { "type": "integer", "enum": [3] } }));
    }

    #[test]
    fn test_property_named_const_is_kept() {
        let mut doc = json!({
            "type": "object",
            "properties": { "const": { "type": "string" } }
        });
        let expected = doc.clone();
        normalize_document(&mut doc);
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_examples_are_not_rewritten() {
        let mut doc = json!({ "example": { "const": 1, "x-nullable": true } });
        let expected = doc.clone();
        normalize_document(&mut doc);
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_default_response_is_still_normalized() {
        let mut doc = json!({
            "responses": {
                "default": {
                    "content": {
                        "application/json": { "schema": { "const": "x" } }
                    }
                }
            }
        });
        normalize_document(&mut doc);
        assert_eq!(
            doc["responses"]["default"]["content"]["application/json"]["schema"],
            json!({ "type": "string", "enum": ["x"] })
        );
    }

    #[test]
    fn test_x_nullable_becomes_nullable() {
        let mut doc = json!({ "type": "string", "x-nullable": true });
        normalize_document(&mut doc);
        assert_eq!(doc, json!({ "type": "string", "nullable": true }));
    }
}
