#![deny(missing_docs)]

//! # OpenAPI Document Model
//!
//! Loads an OpenAPI 3.x document (YAML or JSON) into an immutable
//! `SpecDocument`: path templates, operations, parameters and fully resolved
//! schemas. Loading either succeeds completely or fails with
//! `InvalidSpecDocument` naming the offending JSON pointer.

use crate::error::{ValidatorError, ValidatorResult};
use crate::message::media_type_essence;
use crate::oas::models::{HttpMethod, ParamSource, Parameter};
use crate::oas::normalization::normalize_document;
use crate::oas::ref_utils::{is_local_ref, pointer_child, ref_target, resolve_local_ref};
use crate::oas::schemas::{Schema, SchemaCompiler};
use crate::oas::shims::{
    ShimMediaType, ShimOpenApi, ShimOperation, ShimParameter, ShimRequestBody, ShimResponse,
};
use crate::oas::validation::validate_openapi_root;
use crate::resolver::PathTemplate;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Path Item keys that are not operations.
const PATH_ITEM_FIELDS: [&str; 7] = [
    "summary",
    "description",
    "servers",
    "parameters",
    "$ref",
    "query",
    "additionalOperations",
];

/// Content types mapped to their (optional) schema.
///
/// Keys are media type essences: lower-cased, without parameters.
#[derive(Debug, Clone, Default)]
pub struct ContentMap {
    entries: IndexMap<String, Option<Arc<Schema>>>,
}

impl ContentMap {
    /// True when no media type is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared media types, in document order.
    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Finds the entry for a message content type: exact, then `type/*`, then `*/*`.
    ///
    /// Returns the declared key and its schema.
    pub fn lookup(&self, content_type: &str) -> Option<(&str, Option<&Arc<Schema>>)> {
        let essence = media_type_essence(content_type);
        let wildcard = essence
            .split_once('/')
            .map(|(kind, _)| format!("{}/*", kind))
            .unwrap_or_default();

        let found = [essence.as_str(), wildcard.as_str(), "*/*"]
            .into_iter()
            .find_map(|key| self.entries.get_key_value(key))
            .map(|(key, schema)| (key.as_str(), schema.as_ref()));
        found
    }
}

/// A resolved Request Body Object.
#[derive(Debug, Clone, Default)]
pub struct RequestBodySpec {
    /// Whether the body must be sent.
    pub required: bool,
    /// Schemas per content type.
    pub content: ContentMap,
}

/// A resolved Response Object.
#[derive(Debug, Clone, Default)]
pub struct ResponseSpec {
    /// Schemas per content type.
    pub content: ContentMap,
}

/// A single operation, identified by (path template, method).
#[derive(Debug, Clone)]
pub struct Operation {
    /// Path template, e.g. `/test/{id}`.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// `operationId`, if declared.
    pub operation_id: Option<String>,
    /// Path-level and operation-level parameters, merged.
    pub parameters: Vec<Parameter>,
    /// Request body, if declared.
    pub request_body: Option<RequestBodySpec>,
    /// Responses keyed by `200`, `2XX` or `default`.
    pub responses: IndexMap<String, ResponseSpec>,
}

impl Operation {
    /// Selects the response for a status: exact code, then range (`2XX`), then `default`.
    pub fn response_for(&self, status: u16) -> Option<&ResponseSpec> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        self.responses
            .get(&exact)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&range))
                    .map(|(_, response)| response)
            })
            .or_else(|| self.responses.get("default"))
    }

    /// Parameters declared for one location.
    pub fn parameters_in(&self, source: ParamSource) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.source == source)
    }
}

/// The operations of one path template.
#[derive(Debug, Clone)]
pub struct PathItem {
    template: PathTemplate,
    operations: BTreeMap<HttpMethod, Operation>,
}

impl PathItem {
    /// The compiled template.
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// The operation for a method, if declared.
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        self.operations.get(&method)
    }

    /// All declared operations.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }
}

/// An immutable, fully resolved OpenAPI document.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    openapi: String,
    title: String,
    version: String,
    paths: IndexMap<String, PathItem>,
}

impl SpecDocument {
    /// Loads a document from YAML text (JSON is valid YAML too).
    pub fn from_yaml(text: &str) -> ValidatorResult<Self> {
        let raw: Value = serde_yaml::from_str(text).map_err(|e| {
            ValidatorError::invalid("#", format!("Failed to parse OpenAPI YAML: {}", e))
        })?;
        Self::from_value(raw)
    }

    /// Loads a document from JSON text.
    pub fn from_json(text: &str) -> ValidatorResult<Self> {
        let raw: Value = serde_json::from_str(text).map_err(|e| {
            ValidatorError::invalid("#", format!("Failed to parse OpenAPI JSON: {}", e))
        })?;
        Self::from_value(raw)
    }

    /// Builds the model from an already parsed document tree.
    pub fn from_value(mut raw: Value) -> ValidatorResult<Self> {
        if !raw.is_object() {
            return Err(ValidatorError::invalid(
                "#",
                "OpenAPI document must be a mapping",
            ));
        }
        normalize_document(&mut raw);

        let shim = ShimOpenApi::deserialize(&raw)
            .map_err(|e| ValidatorError::invalid("#", e.to_string()))?;
        validate_openapi_root(&shim)?;

        let mut loader = Loader {
            root: &raw,
            schemas: SchemaCompiler::new(&raw),
        };

        let mut paths = IndexMap::new();
        for (template, item) in &shim.paths.items {
            let path_item = loader.load_path_item(template, item)?;
            paths.insert(template.clone(), path_item);
        }

        let info = shim.info.as_ref();
        let document = SpecDocument {
            openapi: shim.openapi.clone().unwrap_or_default(),
            title: info.map(|i| i.title.clone()).unwrap_or_default(),
            version: info.map(|i| i.version.clone()).unwrap_or_default(),
            paths,
        };

        tracing::debug!(
            title = %document.title,
            operations = document.operations().count(),
            "loaded OpenAPI document"
        );
        Ok(document)
    }

    /// The declared `openapi` version.
    pub fn openapi_version(&self) -> &str {
        &self.openapi
    }

    /// `info.title`.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// `info.version`.
    pub fn api_version(&self) -> &str {
        &self.version
    }

    /// Path templates with their items, in document order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &PathItem)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The Path Item registered under an exact template.
    pub fn path_item(&self, template: &str) -> Option<&PathItem> {
        self.paths.get(template)
    }

    /// The operation registered under an exact template and method.
    pub fn operation(&self, template: &str, method: HttpMethod) -> Option<&Operation> {
        self.path_item(template)?.operation(method)
    }

    /// Every operation in the document.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths.values().flat_map(PathItem::operations)
    }
}

struct Loader<'a> {
    root: &'a Value,
    schemas: SchemaCompiler<'a>,
}

impl<'a> Loader<'a> {
    fn load_path_item(&mut self, template: &str, raw: &Value) -> ValidatorResult<PathItem> {
        let pointer = pointer_child("#/paths", template);
        let compiled = PathTemplate::parse(template).map_err(|e| {
            ValidatorError::invalid(&pointer, format!("Invalid path template: {}", e))
        })?;

        let (item, item_pointer) = self.follow_refs(raw, &pointer)?;
        let Value::Object(item) = item else {
            return Err(ValidatorError::invalid(item_pointer, "Path item must be a mapping"));
        };

        let shared = match item.get("parameters") {
            Some(Value::Array(list)) => {
                self.load_parameters(list, &pointer_child(&item_pointer, "parameters"))?
            }
            Some(_) => {
                return Err(ValidatorError::invalid(
                    pointer_child(&item_pointer, "parameters"),
                    "'parameters' must be a list",
                ))
            }
            None => Vec::new(),
        };

        let mut operations = BTreeMap::new();
        for (key, node) in item {
            if key.starts_with("x-") || PATH_ITEM_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let op_pointer = pointer_child(&item_pointer, key);
            let method = HttpMethod::from_token(key)
                .filter(|m| m.as_lowercase() == key.as_str())
                .ok_or_else(|| {
                    ValidatorError::invalid(&op_pointer, format!("Unknown Path Item field '{}'", key))
                })?;
            let operation = self.load_operation(template, method, node, &op_pointer, &shared)?;
            operations.insert(method, operation);
        }

        Ok(PathItem {
            template: compiled,
            operations,
        })
    }

    fn load_operation(
        &mut self,
        template: &str,
        method: HttpMethod,
        raw: &Value,
        pointer: &str,
        shared: &[Parameter],
    ) -> ValidatorResult<Operation> {
        let shim = ShimOperation::deserialize(raw)
            .map_err(|e| ValidatorError::invalid(pointer, e.to_string()))?;

        let own = self.load_parameters(&shim.parameters, &pointer_child(pointer, "parameters"))?;
        let mut parameters: Vec<Parameter> = shared
            .iter()
            .filter(|p| !own.iter().any(|o| o.same_slot(p)))
            .cloned()
            .collect();
        parameters.extend(own);

        let request_body = match &shim.request_body {
            Some(node) => Some(self.load_request_body(node, &pointer_child(pointer, "requestBody"))?),
            None => None,
        };

        let mut responses = IndexMap::new();
        let responses_pointer = pointer_child(pointer, "responses");
        for (status, node) in &shim.responses {
            if status.starts_with("x-") {
                continue;
            }
            let at = pointer_child(&responses_pointer, status);
            if !is_status_key(status) {
                return Err(ValidatorError::invalid(
                    at,
                    format!("'{}' is not a valid response status", status),
                ));
            }
            responses.insert(status.clone(), self.load_response(node, &at)?);
        }

        Ok(Operation {
            path: template.to_string(),
            method,
            operation_id: shim.operation_id,
            parameters,
            request_body,
            responses,
        })
    }

    fn load_parameters(&mut self, list: &[Value], pointer: &str) -> ValidatorResult<Vec<Parameter>> {
        let mut out: Vec<Parameter> = Vec::with_capacity(list.len());
        for (idx, node) in list.iter().enumerate() {
            let at = format!("{}/{}", pointer, idx);
            let (node, at) = self.follow_refs(node, &at)?;
            let shim = ShimParameter::deserialize(node)
                .map_err(|e| ValidatorError::invalid(&at, e.to_string()))?;
            let source = ParamSource::from_keyword(&shim.location).ok_or_else(|| {
                ValidatorError::invalid(
                    pointer_child(&at, "in"),
                    format!("Unknown parameter location '{}'", shim.location),
                )
            })?;
            let schema = match &shim.schema {
                Some(schema) => Some(self.schemas.compile(schema, &pointer_child(&at, "schema"))?),
                None => None,
            };
            let parameter = Parameter {
                name: shim.name,
                required: shim.required || source == ParamSource::Path,
                source,
                schema,
            };
            if out.iter().any(|p| p.same_slot(&parameter)) {
                return Err(ValidatorError::invalid(
                    at,
                    format!("Duplicate {} parameter '{}'", parameter.source, parameter.name),
                ));
            }
            out.push(parameter);
        }
        Ok(out)
    }

    fn load_request_body(&mut self, raw: &Value, pointer: &str) -> ValidatorResult<RequestBodySpec> {
        let (node, at) = self.follow_refs(raw, pointer)?;
        let shim = ShimRequestBody::deserialize(node)
            .map_err(|e| ValidatorError::invalid(&at, e.to_string()))?;
        Ok(RequestBodySpec {
            required: shim.required,
            content: self.load_content(&shim.content, &pointer_child(&at, "content"))?,
        })
    }

    fn load_response(&mut self, raw: &Value, pointer: &str) -> ValidatorResult<ResponseSpec> {
        let (node, at) = self.follow_refs(raw, pointer)?;
        let shim = ShimResponse::deserialize(node)
            .map_err(|e| ValidatorError::invalid(&at, e.to_string()))?;
        Ok(ResponseSpec {
            content: self.load_content(&shim.content, &pointer_child(&at, "content"))?,
        })
    }

    fn load_content(
        &mut self,
        content: &IndexMap<String, ShimMediaType>,
        pointer: &str,
    ) -> ValidatorResult<ContentMap> {
        let mut entries = IndexMap::new();
        for (media_type, media) in content {
            let at = pointer_child(pointer, media_type);
            let essence = media_type_essence(media_type);
            if essence.is_empty() {
                return Err(ValidatorError::invalid(
                    at,
                    "Content type keys must be non-empty strings",
                ));
            }
            let schema = match &media.schema {
                Some(schema) => Some(self.schemas.compile(schema, &pointer_child(&at, "schema"))?),
                None => None,
            };
            entries.insert(essence, schema);
        }
        Ok(ContentMap { entries })
    }

    /// Follows a chain of Reference Objects, returning the target and its pointer.
    fn follow_refs<'n>(&self, node: &'n Value, pointer: &str) -> ValidatorResult<(&'n Value, String)>
    where
        'a: 'n,
    {
        let mut current = node;
        let mut at = pointer.to_string();
        let mut seen: Vec<String> = Vec::new();

        while let Some(ref_str) = ref_target(current) {
            if !is_local_ref(ref_str) {
                return Err(ValidatorError::invalid(
                    at,
                    format!("External reference '{}' is not supported", ref_str),
                ));
            }
            if seen.iter().any(|r| r == ref_str) {
                return Err(ValidatorError::invalid(
                    at,
                    format!("Reference cycle detected through '{}'", ref_str),
                ));
            }
            current = resolve_local_ref(self.root, ref_str).ok_or_else(|| {
                ValidatorError::invalid(&at, format!("Unresolvable reference '{}'", ref_str))
            })?;
            seen.push(ref_str.to_string());
            at = ref_str.to_string();
        }

        Ok((current, at))
    }
}

/// `200`, `2XX` / `2xx`, or `default`.
fn is_status_key(key: &str) -> bool {
    if key == "default" {
        return true;
    }
    let bytes = key.as_bytes();
    if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
        return false;
    }
    let digits = bytes[1..].iter().all(u8::is_ascii_digit);
    let range = bytes[1..].iter().all(|b| *b == b'X' || *b == b'x');
    digits || range
}
