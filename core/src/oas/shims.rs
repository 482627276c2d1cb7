#![deny(missing_docs)]

//! # Document Shims
//!
//! Structures acting as an Intermediate Deserialization Layer.
//! These structs map directly to OpenAPI YAML objects; schemas and anything
//! that may be a Reference Object stay raw `Value`s until the document model
//! resolves them.

use indexmap::IndexMap;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Schema for the root document.
#[derive(Debug, Deserialize)]
pub(crate) struct ShimOpenApi {
    /// OpenAPI version (e.g. "3.0.3"). Required.
    pub openapi: Option<String>,

    /// Swagger version (e.g. "2.0"); present only in legacy documents.
    pub swagger: Option<String>,

    /// Metadata about the API.
    pub info: Option<ShimInfo>,

    /// Path templates mapped to Path Items.
    #[serde(default)]
    pub paths: ShimPaths,
}

/// The Info Object (only the fields the validator reports).
#[derive(Debug, Deserialize)]
pub(crate) struct ShimInfo {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version.
    #[serde(default)]
    pub version: String,
}

/// Represents the Paths Object, dropping specification extensions.
#[derive(Debug, Default)]
pub(crate) struct ShimPaths {
    /// Raw path items keyed by path template, in document order.
    pub items: IndexMap<String, Value>,
}

impl ShimPaths {
    /// Returns true when no concrete path items are present.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'de> Deserialize<'de> for ShimPaths {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?
            .unwrap_or_default();
        let mut items = IndexMap::new();

        for (key, value) in raw {
            if key.starts_with("x-") {
                continue;
            }
            if !value.is_object() {
                return Err(DeError::custom(format!(
                    "Path item '{}' must be a mapping",
                    key
                )));
            }
            items.insert(key, value);
        }

        Ok(Self { items })
    }
}

/// An Operation Object.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShimOperation {
    /// Unique operation identifier.
    pub operation_id: Option<String>,
    /// Parameters or Reference Objects.
    #[serde(default)]
    pub parameters: Vec<Value>,
    /// Request Body or Reference Object.
    pub request_body: Option<Value>,
    /// Responses keyed by status code, range (`2XX`) or `default`.
    #[serde(default)]
    pub responses: IndexMap<String, Value>,
}

/// A Request Body Object.
#[derive(Debug, Deserialize)]
pub(crate) struct ShimRequestBody {
    /// Media types keyed by content type.
    #[serde(default)]
    pub content: IndexMap<String, ShimMediaType>,
    /// Whether the body must be sent.
    #[serde(default)]
    pub required: bool,
}

/// A Response Object.
#[derive(Debug, Deserialize)]
pub(crate) struct ShimResponse {
    /// Media types keyed by content type.
    #[serde(default)]
    pub content: IndexMap<String, ShimMediaType>,
}

/// A Media Type Object.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ShimMediaType {
    /// Schema or Reference Object.
    pub schema: Option<Value>,
}

/// A Parameter Object.
#[derive(Debug, Deserialize)]
pub(crate) struct ShimParameter {
    /// Parameter name.
    pub name: String,
    /// Location (`path`, `query`, `header`, `cookie`).
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Schema or Reference Object.
    pub schema: Option<Value>,
}
