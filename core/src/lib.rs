#![deny(missing_docs)]

//! # OpenAPI Conformance
//!
//! Checks HTTP requests and responses against an OpenAPI 3.x document, for
//! use in integration test suites.

/// Shared error types.
pub mod error;

/// OpenAPI document loading.
pub mod oas;

/// Path + method to operation resolution.
pub mod resolver;

/// Canonical HTTP messages and framework adapters.
pub mod message;

/// Schema and parameter checks.
pub mod validation;

/// The validator facade.
pub mod validator;

pub use error::{MismatchScope, SchemaMismatch, ValidatorError, ValidatorResult};
pub use message::{CanonicalMessage, IntoCanonical, MessageBody, MessageKind};
pub use oas::{HttpMethod, SpecDocument};
pub use resolver::{normalize_path, resolve, PathTemplate, ResolvedOperation};
pub use validation::{BodyPath, MessageTarget, PathSegment, Violation};
pub use validator::{Validator, ValidatorBuilder, ValidatorOptions};
