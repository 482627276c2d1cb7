#![deny(missing_docs)]

//! # Schema Model
//!
//! The compiled Schema Object tree used by the validator, and the compiler
//! that builds it from the raw document.
//!
//! Compilation inlines every local `$ref`. Each referenced component is
//! compiled once and shared through `Arc`, so the resulting tree is acyclic;
//! a reference that reaches itself is rejected with `InvalidSpecDocument`.

use crate::error::{ValidatorError, ValidatorResult};
use crate::oas::ref_utils::{is_local_ref, pointer_child, resolve_local_ref};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A JSON Schema primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `object`
    Object,
    /// `array`
    Array,
    /// `null`
    Null,
}

impl SchemaType {
    /// Parses a `type` keyword value.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    /// The keyword spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::Null => "null",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treatment of object keys not listed in `properties`.
#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    /// Any extra key is accepted (the default).
    #[default]
    Allowed,
    /// `additionalProperties: false`.
    Forbidden,
    /// Extra keys must match this schema.
    Schema(Arc<Schema>),
}

/// A compiled Schema Object.
///
/// An empty `types` list accepts any instance type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Accepted instance types.
    pub types: Vec<SchemaType>,
    /// OpenAPI 3.0 `nullable`.
    pub nullable: bool,
    /// Set for the `false` boolean schema.
    pub rejects_all: bool,
    /// Names that must be present on an object, in declaration order.
    pub required: Vec<String>,
    /// Property schemas, in declaration order.
    pub properties: IndexMap<String, Arc<Schema>>,
    /// Schema for keys not named in `properties`.
    pub additional_properties: AdditionalProperties,
    /// Minimum number of object keys.
    pub min_properties: Option<u64>,
    /// Maximum number of object keys.
    pub max_properties: Option<u64>,
    /// Schema for every array element.
    pub items: Option<Arc<Schema>>,
    /// Minimum array length.
    pub min_items: Option<u64>,
    /// Maximum array length.
    pub max_items: Option<u64>,
    /// Whether array elements must be pairwise distinct.
    pub unique_items: bool,
    /// Allowed literal values.
    pub enum_values: Option<Vec<Value>>,
    /// Minimum string length, in characters.
    pub min_length: Option<u64>,
    /// Maximum string length, in characters.
    pub max_length: Option<u64>,
    /// Regular expression a string must match (unanchored).
    pub pattern: Option<Regex>,
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Exclusive lower bound.
    pub exclusive_minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
    /// Exclusive upper bound.
    pub exclusive_maximum: Option<f64>,
    /// Value must be an integer multiple of this.
    pub multiple_of: Option<f64>,
    /// Every sub-schema must pass.
    pub all_of: Vec<Arc<Schema>>,
    /// At least one sub-schema must pass.
    pub any_of: Vec<Arc<Schema>>,
    /// Exactly one sub-schema must pass.
    pub one_of: Vec<Arc<Schema>>,
}

impl Schema {
    /// A schema accepting exactly the given types.
    pub fn of_type(ty: SchemaType) -> Self {
        Schema {
            types: vec![ty],
            ..Schema::default()
        }
    }

    /// Whether `types` (or `nullable`) admits `null`.
    pub fn allows_null(&self) -> bool {
        self.nullable || self.types.contains(&SchemaType::Null)
    }

    /// Whether the schema constrains the instance to be a string (or says nothing).
    pub fn accepts_opaque_strings(&self) -> bool {
        self.types.is_empty() || self.types.contains(&SchemaType::String)
    }
}

/// Compiles schemas out of one raw document.
///
/// Holds a cache of compiled `$ref` targets so shared components are built once.
pub(crate) struct SchemaCompiler<'a> {
    root: &'a Value,
    cache: HashMap<String, Arc<Schema>>,
    in_progress: Vec<String>,
}

impl<'a> SchemaCompiler<'a> {
    /// Creates a compiler resolving references against `root`.
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            root,
            cache: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Compiles the schema node found at `pointer`.
    pub(crate) fn compile(&mut self, node: &Value, pointer: &str) -> ValidatorResult<Arc<Schema>> {
        match node {
            Value::Bool(true) => Ok(Arc::new(Schema::default())),
            Value::Bool(false) => Ok(Arc::new(Schema {
                rejects_all: true,
                ..Schema::default()
            })),
            Value::Object(map) => match map.get("$ref") {
                Some(Value::String(ref_str)) => self.compile_ref(ref_str, pointer),
                Some(_) => Err(ValidatorError::invalid(
                    pointer_child(pointer, "$ref"),
                    "'$ref' must be a string",
                )),
                None => self.compile_object(map, pointer).map(Arc::new),
            },
            _ => Err(ValidatorError::invalid(
                pointer,
                "Schema must be an object or a boolean",
            )),
        }
    }

    fn compile_ref(&mut self, ref_str: &str, pointer: &str) -> ValidatorResult<Arc<Schema>> {
        if let Some(schema) = self.cache.get(ref_str) {
            return Ok(schema.clone());
        }
        if !is_local_ref(ref_str) {
            return Err(ValidatorError::invalid(
                pointer,
                format!("External reference '{}' is not supported", ref_str),
            ));
        }
        if self.in_progress.iter().any(|r| r == ref_str) {
            return Err(ValidatorError::invalid(
                pointer,
                format!("Schema reference cycle detected through '{}'", ref_str),
            ));
        }

        let root = self.root;
        let target = resolve_local_ref(root, ref_str).ok_or_else(|| {
            ValidatorError::invalid(pointer, format!("Unresolvable reference '{}'", ref_str))
        })?;

        self.in_progress.push(ref_str.to_string());
        let compiled = self.compile(target, ref_str);
        self.in_progress.pop();

        let compiled = compiled?;
        self.cache.insert(ref_str.to_string(), compiled.clone());
        Ok(compiled)
    }

    fn compile_object(&mut self, map: &Map<String, Value>, pointer: &str) -> ValidatorResult<Schema> {
        let mut schema = Schema {
            types: parse_types(map, pointer)?,
            nullable: flag(map, "nullable", pointer)?,
            required: parse_required(map, pointer)?,
            min_properties: count(map, "minProperties", pointer)?,
            max_properties: count(map, "maxProperties", pointer)?,
            min_items: count(map, "minItems", pointer)?,
            max_items: count(map, "maxItems", pointer)?,
            unique_items: flag(map, "uniqueItems", pointer)?,
            min_length: count(map, "minLength", pointer)?,
            max_length: count(map, "maxLength", pointer)?,
            multiple_of: number(map, "multipleOf", pointer)?,
            ..Schema::default()
        };

        if let Some(values) = map.get("enum") {
            let Value::Array(values) = values else {
                return Err(ValidatorError::invalid(
                    pointer_child(pointer, "enum"),
                    "'enum' must be a list",
                ));
            };
            schema.enum_values = Some(values.clone());
        }

        if let Some(pattern) = map.get("pattern") {
            let at = pointer_child(pointer, "pattern");
            let source = pattern
                .as_str()
                .ok_or_else(|| ValidatorError::invalid(&at, "'pattern' must be a string"))?;
            let regex = Regex::new(source).map_err(|e| {
                ValidatorError::invalid(&at, format!("Invalid pattern '{}': {}", source, e))
            })?;
            schema.pattern = Some(regex);
        }

        parse_bounds(&mut schema, map, pointer)?;

        if let Some(properties) = map.get("properties") {
            let at = pointer_child(pointer, "properties");
            let Value::Object(properties) = properties else {
                return Err(ValidatorError::invalid(at, "'properties' must be a mapping"));
            };
            for (name, node) in properties {
                let compiled = self.compile(node, &pointer_child(&at, name))?;
                schema.properties.insert(name.clone(), compiled);
            }
        }

        if let Some(additional) = map.get("additionalProperties") {
            schema.additional_properties = match additional {
                Value::Bool(true) => AdditionalProperties::Allowed,
                Value::Bool(false) => AdditionalProperties::Forbidden,
                node => AdditionalProperties::Schema(
                    self.compile(node, &pointer_child(pointer, "additionalProperties"))?,
                ),
            };
        }

        if let Some(items) = map.get("items") {
            let at = pointer_child(pointer, "items");
            if items.is_array() {
                return Err(ValidatorError::invalid(at, "'items' must be a single schema"));
            }
            schema.items = Some(self.compile(items, &at)?);
        }

        schema.all_of = self.compile_list(map, "allOf", pointer)?;
        schema.any_of = self.compile_list(map, "anyOf", pointer)?;
        schema.one_of = self.compile_list(map, "oneOf", pointer)?;

        Ok(schema)
    }

    fn compile_list(
        &mut self,
        map: &Map<String, Value>,
        key: &str,
        pointer: &str,
    ) -> ValidatorResult<Vec<Arc<Schema>>> {
        let Some(node) = map.get(key) else {
            return Ok(Vec::new());
        };
        let at = pointer_child(pointer, key);
        let Value::Array(nodes) = node else {
            return Err(ValidatorError::invalid(at, format!("'{}' must be a list", key)));
        };
        nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| self.compile(node, &format!("{}/{}", at, idx)))
            .collect()
    }
}

fn parse_types(map: &Map<String, Value>, pointer: &str) -> ValidatorResult<Vec<SchemaType>> {
    let at = pointer_child(pointer, "type");
    let parse_one = |value: &Value| -> ValidatorResult<SchemaType> {
        let keyword = value
            .as_str()
            .ok_or_else(|| ValidatorError::invalid(&at, "'type' entries must be strings"))?;
        SchemaType::from_keyword(keyword)
            .ok_or_else(|| ValidatorError::invalid(&at, format!("Unknown type '{}'", keyword)))
    };

    match map.get("type") {
        None => Ok(Vec::new()),
        Some(Value::Array(values)) => values.iter().map(parse_one).collect(),
        Some(value) => Ok(vec![parse_one(value)?]),
    }
}

fn parse_required(map: &Map<String, Value>, pointer: &str) -> ValidatorResult<Vec<String>> {
    let Some(node) = map.get("required") else {
        return Ok(Vec::new());
    };
    let at = pointer_child(pointer, "required");
    let Value::Array(names) = node else {
        return Err(ValidatorError::invalid(at, "'required' must be a list of strings"));
    };
    names
        .iter()
        .map(|name| {
            name.as_str()
                .map(str::to_string)
                .ok_or_else(|| ValidatorError::invalid(&at, "'required' must be a list of strings"))
        })
        .collect()
}

/// `minimum`/`maximum` with both the 3.0 boolean and the 3.1 numeric exclusive forms.
fn parse_bounds(schema: &mut Schema, map: &Map<String, Value>, pointer: &str) -> ValidatorResult<()> {
    let minimum = number(map, "minimum", pointer)?;
    let maximum = number(map, "maximum", pointer)?;

    match map.get("exclusiveMinimum") {
        Some(Value::Bool(true)) => schema.exclusive_minimum = minimum,
        Some(Value::Bool(false)) | None => schema.minimum = minimum,
        Some(_) => {
            schema.minimum = minimum;
            schema.exclusive_minimum = number(map, "exclusiveMinimum", pointer)?;
        }
    }

    match map.get("exclusiveMaximum") {
        Some(Value::Bool(true)) => schema.exclusive_maximum = maximum,
        Some(Value::Bool(false)) | None => schema.maximum = maximum,
        Some(_) => {
            schema.maximum = maximum;
            schema.exclusive_maximum = number(map, "exclusiveMaximum", pointer)?;
        }
    }

    Ok(())
}

fn flag(map: &Map<String, Value>, key: &str, pointer: &str) -> ValidatorResult<bool> {
    match map.get(key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ValidatorError::invalid(
            pointer_child(pointer, key),
            format!("'{}' must be a boolean", key),
        )),
    }
}

fn number(map: &Map<String, Value>, key: &str, pointer: &str) -> ValidatorResult<Option<f64>> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            ValidatorError::invalid(pointer_child(pointer, key), format!("'{}' must be a number", key))
        }),
    }
}

fn count(map: &Map<String, Value>, key: &str, pointer: &str) -> ValidatorResult<Option<u64>> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            ValidatorError::invalid(
                pointer_child(pointer, key),
                format!("'{}' must be a non-negative integer", key),
            )
        }),
    }
}
