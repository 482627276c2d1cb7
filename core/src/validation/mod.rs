#![deny(missing_docs)]

//! # Schema Validation
//!
//! Checks message bodies (and, optionally, parameters) against compiled schemas.
//!
//! - **violation**: the `Violation` record and message identity.
//! - **parameters**: path, query, header and cookie parameter checks.
//!
//! Violations are collected depth-first in encounter order. For every node the
//! `type` gate runs first and stops that node on failure; for objects,
//! `required` (including that of `allOf` branches) is always reported before
//! any nested property.

pub mod parameters;
pub mod violation;

pub use violation::{BodyPath, Direction, MessageTarget, PathSegment, Violation};

use crate::error::{ValidatorError, ValidatorResult};
use crate::message::{is_json_media_type, CanonicalMessage, MessageBody};
use crate::oas::document::ContentMap;
use crate::oas::schemas::{AdditionalProperties, Schema, SchemaType};
use serde_json::{Map, Number, Value};

/// Outcome of checking one body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyReport {
    /// The message content type the schema was selected for (empty if none).
    pub content_type: String,
    /// Violations in encounter order; empty means the body passed.
    pub violations: Vec<Violation>,
}

/// Checks `value` against `schema`. An empty result means it passed.
pub fn check(schema: &Schema, value: &Value, target: &MessageTarget) -> Vec<Violation> {
    check_at(schema, value, target, BodyPath::default())
}

/// Like `check`, with every violation path prefixed by `path`.
pub(crate) fn check_at(
    schema: &Schema,
    value: &Value,
    target: &MessageTarget,
    path: BodyPath,
) -> Vec<Violation> {
    let mut checker = Checker {
        target,
        path,
        violations: Vec::new(),
    };
    checker.visit(schema, value);
    checker.violations
}

/// Checks a message body against the content declared for it.
///
/// - No body: passes, unless `body_required`.
/// - A body with no declared content, or none for its content type:
///   `UnsupportedContentType`.
/// - A declared media type without a schema accepts anything.
/// - Opaque bytes only pass a string-typed (or untyped) schema.
pub fn check_body(
    target: &MessageTarget,
    content: Option<&ContentMap>,
    body_required: bool,
    message: &CanonicalMessage,
) -> ValidatorResult<BodyReport> {
    let content_type = message.content_type.clone().unwrap_or_default();
    let report = |violations| BodyReport {
        content_type: content_type.clone(),
        violations,
    };
    let unsupported = || ValidatorError::UnsupportedContentType {
        target: target.clone(),
        content_type: content_type.clone(),
    };

    if message.body.is_empty() {
        let mut violations = Vec::new();
        if body_required {
            violations.push(Violation {
                path: BodyPath::default(),
                keyword: "required",
                message: "Request body is required".to_string(),
                target: target.clone(),
            });
        }
        return Ok(report(violations));
    }

    let content = content.filter(|c| !c.is_empty()).ok_or_else(unsupported)?;
    let declared = message.content_type.as_deref().ok_or_else(unsupported)?;
    let (_, schema) = content.lookup(declared).ok_or_else(unsupported)?;
    let Some(schema) = schema else {
        return Ok(report(Vec::new()));
    };

    match &message.body {
        MessageBody::Empty => Ok(report(Vec::new())),
        MessageBody::Structured(value) => Ok(report(check(schema, value, target))),
        MessageBody::Opaque(_) if is_json_media_type(declared) => Ok(report(vec![Violation {
            path: BodyPath::default(),
            keyword: "json",
            message: "Body is not valid JSON".to_string(),
            target: target.clone(),
        }])),
        MessageBody::Opaque(_) if schema.accepts_opaque_strings() => Ok(report(Vec::new())),
        MessageBody::Opaque(_) => Err(unsupported()),
    }
}

struct Checker<'a> {
    target: &'a MessageTarget,
    path: BodyPath,
    violations: Vec<Violation>,
}

impl Checker<'_> {
    fn push(&mut self, keyword: &'static str, message: String) {
        self.violations.push(Violation {
            path: self.path.clone(),
            keyword,
            message,
            target: self.target.clone(),
        });
    }

    fn passes(&self, schema: &Schema, value: &Value) -> bool {
        check_at(schema, value, self.target, self.path.clone()).is_empty()
    }

    fn visit(&mut self, schema: &Schema, value: &Value) {
        self.visit_node(schema, value, true);
    }

    /// `report_required` is false for `allOf` branches, whose `required`
    /// lists were already reported by the schema that composes them.
    fn visit_node(&mut self, schema: &Schema, value: &Value, report_required: bool) {
        if schema.rejects_all {
            self.push("not", "No value is allowed here".to_string());
            return;
        }
        if value.is_null() && schema.allows_null() {
            return;
        }
        if !self.check_type(schema, value) {
            return;
        }
        if let Some(allowed) = &schema.enum_values {
            if !allowed.contains(value) {
                let list = allowed.iter().map(render).collect::<Vec<_>>().join(", ");
                self.push(
                    "enum",
                    format!(
                        "Value '{}' is not one of the allowed values: {}",
                        render(value),
                        list
                    ),
                );
                return;
            }
        }

        if let Value::Object(map) = value {
            if report_required {
                self.report_required(schema, map);
            }
        }

        for sub in &schema.all_of {
            self.visit_node(sub, value, false);
        }
        if !schema.any_of.is_empty() && !schema.any_of.iter().any(|s| self.passes(s, value)) {
            self.push(
                "anyOf",
                "Value does not match any of the anyOf schemas".to_string(),
            );
        }
        if !schema.one_of.is_empty() {
            let matched = schema.one_of.iter().filter(|s| self.passes(s, value)).count();
            if matched != 1 {
                self.push(
                    "oneOf",
                    format!(
                        "Value matches {} of the oneOf schemas, expected exactly one",
                        matched
                    ),
                );
            }
        }

        match value {
            Value::Object(map) => self.visit_object(schema, map),
            Value::Array(items) => self.visit_array(schema, items),
            Value::String(text) => self.visit_string(schema, text),
            Value::Number(number) => self.visit_number(schema, number),
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn check_type(&mut self, schema: &Schema, value: &Value) -> bool {
        if schema.types.is_empty() {
            return true;
        }
        let accepted = schema.types.iter().any(|ty| type_accepts(*ty, value));
        if !accepted {
            let expected = schema
                .types
                .iter()
                .map(SchemaType::as_str)
                .collect::<Vec<_>>()
                .join("|");
            self.push(
                "type",
                format!(
                    "Value expected to be '{}', '{}' given",
                    expected,
                    type_name(value)
                ),
            );
        }
        accepted
    }

    /// Missing properties named by `required` here or in any `allOf` branch,
    /// each reported once, before any property is visited.
    fn report_required(&mut self, schema: &Schema, map: &Map<String, Value>) {
        let mut names: Vec<&str> = Vec::new();
        collect_required(schema, &mut names);
        for name in names.into_iter().filter(|name| !map.contains_key(*name)) {
            self.path.push(PathSegment::Property(name.to_string()));
            self.push(
                "required",
                format!("Required property '{}' must be present in the object", name),
            );
            self.path.pop();
        }
    }

    fn visit_object(&mut self, schema: &Schema, map: &Map<String, Value>) {
        for (name, sub) in &schema.properties {
            if let Some(child) = map.get(name) {
                self.path.push(PathSegment::Property(name.clone()));
                self.visit(sub, child);
                self.path.pop();
            }
        }

        match &schema.additional_properties {
            AdditionalProperties::Allowed => {}
            AdditionalProperties::Forbidden => {
                for key in map.keys().filter(|k| !schema.properties.contains_key(*k)) {
                    self.path.push(PathSegment::Property(key.clone()));
                    self.push(
                        "additionalProperties",
                        format!("Property '{}' is not allowed", key),
                    );
                    self.path.pop();
                }
            }
            AdditionalProperties::Schema(extra) => {
                for (key, child) in map.iter().filter(|(k, _)| !schema.properties.contains_key(*k)) {
                    self.path.push(PathSegment::Property(key.clone()));
                    self.visit(extra, child);
                    self.path.pop();
                }
            }
        }

        let len = map.len() as u64;
        if let Some(min) = schema.min_properties.filter(|min| len < *min) {
            self.push(
                "minProperties",
                format!(
                    "The number of object properties must be greater or equal to {}",
                    min
                ),
            );
        }
        if let Some(max) = schema.max_properties.filter(|max| len > *max) {
            self.push(
                "maxProperties",
                format!(
                    "The number of object properties must be less or equal to {}",
                    max
                ),
            );
        }
    }

    fn visit_array(&mut self, schema: &Schema, items: &[Value]) {
        let len = items.len() as u64;
        if let Some(min) = schema.min_items.filter(|min| len < *min) {
            self.push(
                "minItems",
                format!(
                    "Size of an array must be greater or equal to {}, but is {}",
                    min, len
                ),
            );
        }
        if let Some(max) = schema.max_items.filter(|max| len > *max) {
            self.push(
                "maxItems",
                format!(
                    "Size of an array must be less or equal to {}, but is {}",
                    max, len
                ),
            );
        }
        if schema.unique_items && has_duplicates(items) {
            self.push("uniqueItems", "All array items must be unique".to_string());
        }

        if let Some(item_schema) = &schema.items {
            for (idx, item) in items.iter().enumerate() {
                self.path.push(PathSegment::Index(idx));
                self.visit(item_schema, item);
                self.path.pop();
            }
        }
    }

    fn visit_string(&mut self, schema: &Schema, text: &str) {
        let len = text.chars().count() as u64;
        if let Some(min) = schema.min_length.filter(|min| len < *min) {
            self.push(
                "minLength",
                format!("Length of '{}' must be longer or equal to {}", text, min),
            );
        }
        if let Some(max) = schema.max_length.filter(|max| len > *max) {
            self.push(
                "maxLength",
                format!("Length of '{}' must be shorter or equal to {}", text, max),
            );
        }
        if let Some(pattern) = &schema.pattern {
            if !pattern.is_match(text) {
                self.push(
                    "pattern",
                    format!(
                        "Value '{}' does not match pattern '{}'",
                        text,
                        pattern.as_str()
                    ),
                );
            }
        }
    }

    fn visit_number(&mut self, schema: &Schema, number: &Number) {
        let Some(value) = number.as_f64() else {
            return;
        };

        if let Some(min) = schema.minimum.filter(|min| value < *min) {
            self.push(
                "minimum",
                format!("Value {} must be greater or equal to {}", number, min),
            );
        }
        if let Some(min) = schema.exclusive_minimum.filter(|min| value <= *min) {
            self.push(
                "exclusiveMinimum",
                format!("Value {} must be greater than {}", number, min),
            );
        }
        if let Some(max) = schema.maximum.filter(|max| value > *max) {
            self.push(
                "maximum",
                format!("Value {} must be less or equal to {}", number, max),
            );
        }
        if let Some(max) = schema.exclusive_maximum.filter(|max| value >= *max) {
            self.push(
                "exclusiveMaximum",
                format!("Value {} must be less than {}", number, max),
            );
        }
        if let Some(divisor) = schema.multiple_of.filter(|d| *d > 0.0) {
            let quotient = value / divisor;
            if (quotient - quotient.round()).abs() > 1e-9 {
                self.push(
                    "multipleOf",
                    format!("Value {} is not a multiple of {}", number, divisor),
                );
            }
        }
    }
}

fn collect_required<'s>(schema: &'s Schema, names: &mut Vec<&'s str>) {
    for name in &schema.required {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }
    for sub in &schema.all_of {
        collect_required(sub, names);
    }
}

fn type_accepts(ty: SchemaType, value: &Value) -> bool {
    match (ty, value) {
        (SchemaType::String, Value::String(_)) => true,
        (SchemaType::Boolean, Value::Bool(_)) => true,
        (SchemaType::Object, Value::Object(_)) => true,
        (SchemaType::Array, Value::Array(_)) => true,
        (SchemaType::Null, Value::Null) => true,
        (SchemaType::Number, Value::Number(_)) => true,
        (SchemaType::Integer, Value::Number(n)) => is_integral(n),
        _ => false,
    }
}

fn is_integral(number: &Number) -> bool {
    number.is_i64() || number.is_u64() || number.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strings unquoted, everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(idx, item)| items[idx + 1..].contains(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::models::HttpMethod;
    use crate::oas::schemas::SchemaCompiler;
    use serde_json::json;

    fn target() -> MessageTarget {
        MessageTarget::request(HttpMethod::Post, "/test")
    }

    fn schema(raw: Value) -> std::sync::Arc<Schema> {
        let root = json!({ "s": raw });
        SchemaCompiler::new(&root).compile(&root["s"], "#/s").unwrap()
    }

    fn messages(schema: &Schema, value: Value) -> Vec<String> {
        check(schema, &value, &target())
            .into_iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn test_required_property() {
        let s = schema(json!({
            "type": "object",
            "required": ["foo"],
            "properties": { "foo": { "type": "string" } }
        }));
        assert!(messages(&s, json!({"foo": "bar"})).is_empty());

        let violations = check(&s, &json!({"baz": "bar"}), &target());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].keyword, "required");
        assert_eq!(violations[0].path.to_string(), "foo");
        assert_eq!(
            violations[0].message,
            "Required property 'foo' must be present in the object"
        );
    }

    #[test]
    fn test_required_reported_before_sibling_types() {
        let s = schema(json!({
            "type": "object",
            "required": ["name", "age"],
            "properties": {
                "age": { "type": "integer" },
                "name": { "type": "string" }
            }
        }));
        let violations = check(&s, &json!({"age": "old"}), &target());
        let keywords: Vec<_> = violations.iter().map(|v| v.keyword).collect();
        assert_eq!(keywords, vec!["required", "type"]);
        assert_eq!(violations[0].path.to_string(), "name");
        assert_eq!(violations[1].path.to_string(), "age");
    }

    #[test]
    fn test_required_reported_before_all_of_properties() {
        let s = schema(json!({
            "type": "object",
            "required": ["name"],
            "allOf": [
                { "properties": { "age": { "type": "integer" } } },
                { "required": ["name", "email"] }
            ]
        }));
        let violations = check(&s, &json!({"age": "old"}), &target());
        let summary: Vec<_> = violations
            .iter()
            .map(|v| (v.keyword, v.path.to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("required", "name".to_string()),
                ("required", "email".to_string()),
                ("type", "age".to_string()),
            ]
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let s = schema(json!({ "type": "string" }));
        assert_eq!(
            messages(&s, json!(5)),
            vec!["Value expected to be 'string', 'integer' given".to_string()]
        );
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        let s = schema(json!({ "type": "integer" }));
        assert!(messages(&s, json!(3.0)).is_empty());
        assert_eq!(messages(&s, json!(3.5)).len(), 1);
        let n = schema(json!({ "type": "number" }));
        assert!(messages(&n, json!(3)).is_empty());
    }

    #[test]
    fn test_nullable() {
        let s = schema(json!({ "type": "string", "nullable": true }));
        assert!(messages(&s, json!(null)).is_empty());
        let strict = schema(json!({ "type": "string" }));
        assert_eq!(
            messages(&strict, json!(null)),
            vec!["Value expected to be 'string', 'null' given".to_string()]
        );
        let union = schema(json!({ "type": ["integer", "null"] }));
        assert!(messages(&union, json!(null)).is_empty());
    }

    #[test]
    fn test_enum_deep_equality() {
        let s = schema(json!({ "enum": ["a", {"k": [1, 2]}] }));
        assert!(messages(&s, json!({"k": [1, 2]})).is_empty());
        assert_eq!(
            messages(&s, json!("b")),
            vec![r#"Value 'b' is not one of the allowed values: a, {"k":[1,2]}"#.to_string()]
        );
    }

    #[test]
    fn test_nested_paths() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id"],
                        "properties": { "id": { "type": "integer" } }
                    }
                }
            }
        }));
        let violations = check(&s, &json!({"items": [{"id": 1}, {"id": "x"}, {}]}), &target());
        let paths: Vec<_> = violations.iter().map(|v| v.path.json_pointer()).collect();
        assert_eq!(paths, vec!["/items/1/id", "/items/2/id"]);
        assert_eq!(violations[0].to_string(), "Value expected to be 'integer', 'string' given Field: items.1.id");
    }

    #[test]
    fn test_additional_properties() {
        let closed = schema(json!({
            "type": "object",
            "properties": { "a": {} },
            "additionalProperties": false
        }));
        assert_eq!(
            messages(&closed, json!({"a": 1, "b": 2})),
            vec!["Property 'b' is not allowed Field: b".to_string()]
        );

        let typed = schema(json!({ "type": "object", "additionalProperties": { "type": "integer" } }));
        assert!(messages(&typed, json!({"x": 1})).is_empty());
        assert_eq!(messages(&typed, json!({"x": "1"})).len(), 1);
    }

    #[test]
    fn test_composition() {
        let any = schema(json!({ "anyOf": [{ "type": "string" }, { "type": "integer" }] }));
        assert!(messages(&any, json!(1)).is_empty());
        assert_eq!(messages(&any, json!(true)).len(), 1);

        let one = schema(json!({ "oneOf": [{ "type": "number" }, { "type": "integer" }] }));
        assert!(messages(&one, json!(1.5)).is_empty());
        assert_eq!(
            messages(&one, json!(1)),
            vec!["Value matches 2 of the oneOf schemas, expected exactly one".to_string()]
        );

        let all = schema(json!({ "allOf": [
            { "required": ["a"] },
            { "required": ["b"] }
        ] }));
        assert_eq!(messages(&all, json!({})).len(), 2);
    }

    #[test]
    fn test_string_keywords() {
        let s = schema(json!({ "type": "string", "minLength": 2, "maxLength": 3, "pattern": "^[a-z]+$" }));
        assert!(messages(&s, json!("ab")).is_empty());
        assert_eq!(
            messages(&s, json!("a")),
            vec!["Length of 'a' must be longer or equal to 2".to_string()]
        );
        assert_eq!(messages(&s, json!("abcd")).len(), 1);
        assert_eq!(
            messages(&s, json!("A1")),
            vec!["Value 'A1' does not match pattern '^[a-z]+$'".to_string()]
        );
    }

    #[test]
    fn test_number_keywords() {
        let s = schema(json!({ "type": "number", "minimum": 1, "exclusiveMaximum": 10, "multipleOf": 0.5 }));
        assert!(messages(&s, json!(9.5)).is_empty());
        assert_eq!(
            messages(&s, json!(0)),
            vec!["Value 0 must be greater or equal to 1".to_string()]
        );
        assert_eq!(messages(&s, json!(10)).len(), 1);
        assert_eq!(
            messages(&s, json!(1.2)),
            vec!["Value 1.2 is not a multiple of 0.5".to_string()]
        );
    }

    #[test]
    fn test_array_keywords() {
        let s = schema(json!({ "type": "array", "minItems": 1, "maxItems": 2, "uniqueItems": true }));
        assert!(messages(&s, json!([1, 2])).is_empty());
        assert_eq!(
            messages(&s, json!([])),
            vec!["Size of an array must be greater or equal to 1, but is 0".to_string()]
        );
        assert_eq!(messages(&s, json!([1, 2, 3])).len(), 1);
        assert_eq!(
            messages(&s, json!([1, 1])),
            vec!["All array items must be unique".to_string()]
        );
    }

    #[test]
    fn test_false_schema() {
        let s = schema(json!({ "type": "object", "properties": { "gone": false } }));
        assert_eq!(
            messages(&s, json!({"gone": 1})),
            vec!["No value is allowed here Field: gone".to_string()]
        );
    }

    fn content(yaml_schema: Value) -> ContentMap {
        let doc = crate::oas::document::SpecDocument::from_value(json!({
            "openapi": "3.0.3",
            "info": { "title": "c", "version": "1" },
            "paths": {
                "/c": {
                    "post": {
                        "requestBody": { "content": { "application/json": { "schema": yaml_schema }, "text/plain": {} } },
                        "responses": {}
                    }
                }
            }
        }))
        .unwrap();
        doc.operation("/c", HttpMethod::Post)
            .and_then(|op| op.request_body.clone())
            .map(|body| body.content)
            .unwrap()
    }

    #[test]
    fn test_check_body_rules() {
        let content = content(json!({ "type": "object", "required": ["foo"] }));
        let t = target();

        let empty = CanonicalMessage::request("post", "/c");
        assert!(check_body(&t, Some(&content), false, &empty).unwrap().violations.is_empty());
        let required = check_body(&t, Some(&content), true, &empty).unwrap();
        assert_eq!(required.violations[0].message, "Request body is required");

        let ok = CanonicalMessage::request("post", "/c").with_json(json!({"foo": 1}));
        assert!(check_body(&t, Some(&content), false, &ok).unwrap().violations.is_empty());

        let text = CanonicalMessage::request("post", "/c")
            .with_header("content-type", "text/plain")
            .with_body("anything");
        assert!(check_body(&t, Some(&content), false, &text).unwrap().violations.is_empty());

        let xml = CanonicalMessage::request("post", "/c")
            .with_header("content-type", "application/xml")
            .with_body("<a/>");
        let err = check_body(&t, Some(&content), false, &xml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Content-Type \"application/xml\" is not expected for Request [post /test]"
        );

        let broken = CanonicalMessage::request("post", "/c")
            .with_header("content-type", "application/json")
            .with_body("{oops");
        let report = check_body(&t, Some(&content), false, &broken).unwrap();
        assert_eq!(report.violations[0].message, "Body is not valid JSON");
        assert_eq!(report.violations[0].keyword, "json");
    }

    #[test]
    fn test_body_without_declared_content() {
        let msg = CanonicalMessage::response(200).with_json(json!({"a": 1}));
        let err = check_body(&target(), None, false, &msg).unwrap_err();
        assert!(matches!(err, ValidatorError::UnsupportedContentType { .. }));
        assert!(check_body(&target(), None, false, &CanonicalMessage::response(200))
            .unwrap()
            .violations
            .is_empty());
    }
}
