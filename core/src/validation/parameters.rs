//! # Parameter Checks
//!
//! Checks path, query, header and cookie parameters of a request against the
//! operation's declared parameters. Raw values are coerced to the scalar type
//! their schema asks for before the schema runs.

use crate::message::CanonicalMessage;
use crate::oas::document::Operation;
use crate::oas::models::{ParamSource, Parameter};
use crate::oas::schemas::{Schema, SchemaType};
use crate::validation::{check_at, BodyPath, MessageTarget, Violation};
use indexmap::IndexMap;
use serde_json::{Number, Value};
use url::form_urlencoded;

/// Raw parameter values found in one request, per location.
#[derive(Debug, Clone, Default)]
pub struct ParameterValues {
    path: Option<IndexMap<String, String>>,
    query: IndexMap<String, Vec<String>>,
    cookies: IndexMap<String, String>,
}

impl ParameterValues {
    /// Collects values from a message. `path` holds the captures of the
    /// resolved template, or `None` when the concrete path is unknown.
    pub fn collect(message: &CanonicalMessage, path: Option<IndexMap<String, String>>) -> Self {
        let mut query: IndexMap<String, Vec<String>> = IndexMap::new();
        if let Some(raw) = &message.query {
            for (name, value) in form_urlencoded::parse(raw.as_bytes()) {
                query
                    .entry(name.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }

        let cookies = message
            .header("cookie")
            .map(parse_cookies)
            .unwrap_or_default();

        Self {
            path,
            query,
            cookies,
        }
    }

    fn raw(&self, parameter: &Parameter, message: &CanonicalMessage) -> Lookup {
        match parameter.source {
            ParamSource::Path => match &self.path {
                None => Lookup::Unknown,
                Some(map) => map
                    .get(&parameter.name)
                    .map(|v| Lookup::Found(vec![v.clone()]))
                    .unwrap_or(Lookup::Missing),
            },
            ParamSource::Query => self
                .query
                .get(&parameter.name)
                .map(|v| Lookup::Found(v.clone()))
                .unwrap_or(Lookup::Missing),
            ParamSource::Header => message
                .header(&parameter.name)
                .map(|v| Lookup::Found(vec![v.to_string()]))
                .unwrap_or(Lookup::Missing),
            ParamSource::Cookie => self
                .cookies
                .get(&parameter.name)
                .map(|v| Lookup::Found(vec![v.clone()]))
                .unwrap_or(Lookup::Missing),
        }
    }
}

enum Lookup {
    Found(Vec<String>),
    Missing,
    Unknown,
}

/// Checks every declared parameter of `operation`. An empty result means they all passed.
///
/// Violation paths start with the parameter name.
pub fn check_parameters(
    operation: &Operation,
    values: &ParameterValues,
    message: &CanonicalMessage,
    target: &MessageTarget,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for parameter in operation.parameters.iter().filter(|p| !is_ignored_header(p)) {
        let raw = match values.raw(parameter, message) {
            Lookup::Found(raw) => raw,
            Lookup::Unknown => continue,
            Lookup::Missing => {
                if parameter.required {
                    violations.push(Violation {
                        path: BodyPath::from_property(&parameter.name),
                        keyword: "required",
                        message: format!(
                            "Required parameter '{}' in {} must be present",
                            parameter.name, parameter.source
                        ),
                        target: target.clone(),
                    });
                }
                continue;
            }
        };

        let Some(schema) = &parameter.schema else {
            continue;
        };
        let value = coerce(schema, &raw);
        tracing::trace!(parameter = %parameter.name, location = %parameter.source, "checking parameter");
        violations.extend(check_at(
            schema,
            &value,
            target,
            BodyPath::from_property(&parameter.name),
        ));
    }

    violations
}

/// Header parameters that OpenAPI says are ignored when declared.
const IGNORED_HEADERS: [&str; 3] = ["accept", "content-type", "authorization"];

fn is_ignored_header(parameter: &Parameter) -> bool {
    parameter.source == ParamSource::Header
        && IGNORED_HEADERS
            .iter()
            .any(|name| parameter.name.eq_ignore_ascii_case(name))
}

/// Turns raw strings into the JSON value the schema expects.
///
/// Values that do not parse stay strings so the `type` check reports them.
fn coerce(schema: &Schema, raw: &[String]) -> Value {
    if schema.types.contains(&SchemaType::Array) {
        let items: Vec<&str> = match raw {
            [single] => single.split(',').collect(),
            many => many.iter().map(String::as_str).collect(),
        };
        let item_schema = schema.items.as_deref();
        return Value::Array(
            items
                .into_iter()
                .map(|item| match item_schema {
                    Some(s) => coerce_scalar(s, item),
                    None => Value::String(item.to_string()),
                })
                .collect(),
        );
    }

    let last = raw.last().map(String::as_str).unwrap_or_default();
    coerce_scalar(schema, last)
}

fn coerce_scalar(schema: &Schema, raw: &str) -> Value {
    for ty in &schema.types {
        let parsed = match ty {
            SchemaType::Integer => raw
                .parse::<i64>()
                .ok()
                .map(|n| Value::Number(n.into())),
            SchemaType::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            SchemaType::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            SchemaType::Null if raw.is_empty() => Some(Value::Null),
            _ => None,
        };
        if let Some(value) = parsed {
            return value;
        }
    }
    Value::String(raw.to_string())
}

fn parse_cookies(header: &str) -> IndexMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::document::SpecDocument;
    use crate::oas::models::HttpMethod;
    use serde_json::json;

    fn document() -> SpecDocument {
        SpecDocument::from_value(json!({
            "openapi": "3.0.3",
            "info": { "title": "params", "version": "1" },
            "paths": {
                "/items/{id}": {
                    "parameters": [
                        { "name": "id", "in": "path", "schema": { "type": "integer", "minimum": 1 } }
                    ],
                    "get": {
                        "parameters": [
                            { "name": "limit", "in": "query", "schema": { "type": "integer" } },
                            { "name": "tags", "in": "query", "schema": { "type": "array", "items": { "type": "string" } } },
                            { "name": "X-Trace", "in": "header", "required": true, "schema": { "type": "string" } },
                            { "name": "session", "in": "cookie", "schema": { "type": "boolean" } },
                            { "name": "Authorization", "in": "header", "required": true, "schema": { "type": "integer" } },
                            { "name": "accept", "in": "header", "required": true }
                        ],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn run(message: &CanonicalMessage, path: Option<IndexMap<String, String>>) -> Vec<Violation> {
        let doc = document();
        let operation = doc.operation("/items/{id}", HttpMethod::Get).unwrap();
        let target = MessageTarget::request(HttpMethod::Get, "/items/{id}");
        let values = ParameterValues::collect(message, path);
        check_parameters(operation, &values, message, &target)
    }

    fn captured(id: &str) -> Option<IndexMap<String, String>> {
        Some(IndexMap::from([("id".to_string(), id.to_string())]))
    }

    #[test]
    fn test_valid_parameters() {
        let msg = CanonicalMessage::request("get", "/items/3?limit=10&tags=a,b")
            .with_header("X-Trace", "abc")
            .with_header("Cookie", "session=true; other=1");
        assert!(run(&msg, captured("3")).is_empty());
    }

    #[test]
    fn test_missing_required_header() {
        let msg = CanonicalMessage::request("get", "/items/3");
        let violations = run(&msg, captured("3"));
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Required parameter 'X-Trace' in header must be present"
        );
    }

    #[test]
    fn test_coercion_failures_are_type_violations() {
        let msg = CanonicalMessage::request("get", "/items/0?limit=ten")
            .with_header("x-trace", "abc")
            .with_header("cookie", "session=maybe");
        let violations = run(&msg, captured("0"));
        let summary: Vec<_> = violations
            .iter()
            .map(|v| (v.path.to_string(), v.keyword))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("id".to_string(), "minimum"),
                ("limit".to_string(), "type"),
                ("session".to_string(), "type"),
            ]
        );
    }

    #[test]
    fn test_reserved_headers_are_ignored() {
        let missing = CanonicalMessage::request("get", "/items/3").with_header("x-trace", "abc");
        assert!(run(&missing, captured("3")).is_empty());

        let mismatched = missing.with_header("Authorization", "Bearer token");
        assert!(run(&mismatched, captured("3")).is_empty());
    }

    #[test]
    fn test_unknown_path_values_are_skipped() {
        let msg = CanonicalMessage::request("get", "/").with_header("x-trace", "abc");
        assert!(run(&msg, None).is_empty());
    }

    #[test]
    fn test_coerce_arrays() {
        let schema = Schema {
            types: vec![SchemaType::Array],
            items: Some(std::sync::Arc::new(Schema::of_type(SchemaType::Integer))),
            ..Schema::default()
        };
        assert_eq!(coerce(&schema, &["1,2".to_string()]), json!([1, 2]));
        assert_eq!(
            coerce(&schema, &["1".to_string(), "x".to_string()]),
            json!([1, "x"])
        );
    }
}
