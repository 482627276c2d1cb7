#![deny(missing_docs)]

//! # Validator Facade
//!
//! The single entry point test suites call: hand it a message, the path and
//! the method, and get `Ok(true)` or the `ValidatorError` describing the first
//! mismatch.
//!
//! ```
//! use openapi_conformance::{CanonicalMessage, ValidatorBuilder};
//!
//! let yaml = r#"
//! openapi: 3.0.3
//! info: { title: demo, version: "1" }
//! paths:
//!   /test:
//!     get:
//!       responses:
//!         "200":
//!           description: ok
//! "#;
//! let validator = ValidatorBuilder::from_yaml(yaml).build().unwrap();
//! assert!(validator.get(CanonicalMessage::response(200), "/test").unwrap());
//! ```

use crate::error::{MismatchScope, SchemaMismatch, ValidatorError, ValidatorResult};
use crate::message::{CanonicalMessage, IntoCanonical, MessageKind};
use crate::oas::document::SpecDocument;
use crate::oas::models::HttpMethod;
use crate::resolver::{normalize_path, resolve};
use crate::validation::parameters::{check_parameters, ParameterValues};
use crate::validation::{check_body, MessageTarget, Violation};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tunables for a `Validator`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ValidatorOptions {
    /// Also check path, query, header and cookie parameters of requests.
    pub check_parameters: bool,
}

/// Checks HTTP messages against one loaded OpenAPI document.
///
/// Cheap to clone; clones share the document.
#[derive(Debug, Clone)]
pub struct Validator {
    document: Arc<SpecDocument>,
    options: ValidatorOptions,
}

impl Validator {
    /// A validator with default options.
    pub fn new(document: Arc<SpecDocument>) -> Self {
        Self::with_options(document, ValidatorOptions::default())
    }

    /// A validator with explicit options.
    pub fn with_options(document: Arc<SpecDocument>, options: ValidatorOptions) -> Self {
        Self { document, options }
    }

    /// The loaded document.
    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    /// Validates `message` against the operation at `path` + `method`.
    ///
    /// Returns `Ok(true)` on success. On a mismatch the error carries every
    /// violation, and renders the first one.
    pub fn validate<M: IntoCanonical>(
        &self,
        message: M,
        path: &str,
        method: &str,
    ) -> ValidatorResult<bool> {
        let message = message.into_canonical()?;
        match self.inspect(&message, path, method)?.into_iter().next() {
            None => Ok(true),
            Some(mismatch) => {
                tracing::debug!(
                    operation = %mismatch.target,
                    violations = mismatch.violations.len(),
                    "message does not conform"
                );
                Err(ValidatorError::SchemaViolation(mismatch))
            }
        }
    }

    /// Every violation of `message`, in encounter order. Empty means it conforms.
    ///
    /// Fails only when the operation, response or content type cannot be matched.
    pub fn violations<M: IntoCanonical>(
        &self,
        message: M,
        path: &str,
        method: &str,
    ) -> ValidatorResult<Vec<Violation>> {
        let message = message.into_canonical()?;
        Ok(self
            .inspect(&message, path, method)?
            .into_iter()
            .flat_map(|mismatch| mismatch.violations)
            .collect())
    }

    /// `validate` with a typed method.
    pub fn validate_as<M: IntoCanonical>(
        &self,
        message: M,
        path: &str,
        method: HttpMethod,
    ) -> ValidatorResult<bool> {
        self.validate(message, path, method.as_lowercase())
    }

    /// Validates against the `GET` operation at `path`.
    pub fn get<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Get)
    }

    /// Validates against the `POST` operation at `path`.
    pub fn post<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Post)
    }

    /// Validates against the `PUT` operation at `path`.
    pub fn put<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Put)
    }

    /// Validates against the `PATCH` operation at `path`.
    pub fn patch<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Patch)
    }

    /// Validates against the `DELETE` operation at `path`.
    pub fn delete<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Delete)
    }

    /// Validates against the `HEAD` operation at `path`.
    pub fn head<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Head)
    }

    /// Validates against the `OPTIONS` operation at `path`.
    pub fn options<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Options)
    }

    /// Validates against the `TRACE` operation at `path`.
    pub fn trace<M: IntoCanonical>(&self, message: M, path: &str) -> ValidatorResult<bool> {
        self.validate_as(message, path, HttpMethod::Trace)
    }

    /// Runs every check and returns the non-empty mismatches: parameters first, then the body.
    fn inspect(
        &self,
        message: &CanonicalMessage,
        path: &str,
        method: &str,
    ) -> ValidatorResult<Vec<SchemaMismatch>> {
        let resolved = resolve(&self.document, path, method)?;
        let operation = resolved.operation;
        let mut mismatches = Vec::new();

        let (target, content, body_required) = match message.kind {
            MessageKind::Request { .. } => {
                let target = MessageTarget::request(operation.method, operation.path.as_str());
                if self.options.check_parameters {
                    let captured = if resolved.path_params.is_empty() {
                        resolved.template.captures(&normalize_path(&message.path))
                    } else {
                        Some(resolved.path_params.clone())
                    };
                    let values = ParameterValues::collect(message, captured);
                    let violations = check_parameters(operation, &values, message, &target);
                    if !violations.is_empty() {
                        mismatches.push(SchemaMismatch {
                            scope: MismatchScope::Parameters,
                            target: target.clone(),
                            violations,
                        });
                    }
                }
                let body = operation.request_body.as_ref();
                (
                    target,
                    body.map(|b| &b.content),
                    body.is_some_and(|b| b.required),
                )
            }
            MessageKind::Response { status } => {
                let response = operation.response_for(status).ok_or_else(|| {
                    ValidatorError::ResponseNotDeclared {
                        path: path.to_string(),
                        method: method.to_string(),
                        status,
                    }
                })?;
                let target =
                    MessageTarget::response(operation.method, operation.path.as_str(), status);
                (target, Some(&response.content), false)
            }
        };

        let report = check_body(&target, content, body_required, message)?;
        if !report.violations.is_empty() {
            mismatches.push(SchemaMismatch {
                scope: MismatchScope::Body {
                    content_type: report.content_type,
                },
                target,
                violations: report.violations,
            });
        }
        Ok(mismatches)
    }
}

#[derive(Debug, Clone)]
enum Source {
    Yaml(String),
    Json(String),
    YamlFile(PathBuf),
    JsonFile(PathBuf),
    Document(Arc<SpecDocument>),
}

/// Configures and loads a `Validator`.
///
/// The document is read and checked in `build`, so a bad file surfaces there.
#[derive(Debug, Clone)]
pub struct ValidatorBuilder {
    source: Source,
    options: ValidatorOptions,
}

impl ValidatorBuilder {
    fn with_source(source: Source) -> Self {
        Self {
            source,
            options: ValidatorOptions::default(),
        }
    }

    /// From YAML text.
    pub fn from_yaml(text: impl Into<String>) -> Self {
        Self::with_source(Source::Yaml(text.into()))
    }

    /// From JSON text.
    pub fn from_json(text: impl Into<String>) -> Self {
        Self::with_source(Source::Json(text.into()))
    }

    /// From a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Self {
        Self::with_source(Source::YamlFile(path.as_ref().to_path_buf()))
    }

    /// From a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Self {
        Self::with_source(Source::JsonFile(path.as_ref().to_path_buf()))
    }

    /// From an already loaded document.
    pub fn from_document(document: Arc<SpecDocument>) -> Self {
        Self::with_source(Source::Document(document))
    }

    /// Replaces all options.
    pub fn options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables parameter checks.
    pub fn check_parameters(mut self, enabled: bool) -> Self {
        self.options.check_parameters = enabled;
        self
    }

    /// Loads the document and returns the validator.
    pub fn build(self) -> ValidatorResult<Validator> {
        let document = match self.source {
            Source::Yaml(text) => Arc::new(SpecDocument::from_yaml(&text)?),
            Source::Json(text) => Arc::new(SpecDocument::from_json(&text)?),
            Source::YamlFile(path) => {
                tracing::debug!(path = %path.display(), "reading OpenAPI document");
                Arc::new(SpecDocument::from_yaml(&std::fs::read_to_string(path)?)?)
            }
            Source::JsonFile(path) => {
                tracing::debug!(path = %path.display(), "reading OpenAPI document");
                Arc::new(SpecDocument::from_json(&std::fs::read_to_string(path)?)?)
            }
            Source::Document(document) => document,
        };
        Ok(Validator::with_options(document, self.options))
    }

    /// Alias for `build`.
    pub fn get_validator(self) -> ValidatorResult<Validator> {
        self.build()
    }
}
