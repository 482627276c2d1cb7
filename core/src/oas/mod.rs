#![deny(missing_docs)]

//! # OpenAPI Document Module
//!
//! - **document**: Loading a document into the immutable `SpecDocument`.
//! - **models**: Methods, parameter locations and parameters.
//! - **normalization**: Rewrites applied to the raw document before loading.
//! - **schemas**: Compiled schemas and the compiler resolving `$ref`.
//! - **shims**: Serde views of the raw document.
//! - **validation**: Structural checks on the document root.

pub mod document;
pub mod models;
pub(crate) mod normalization;
pub(crate) mod ref_utils;
pub mod schemas;
pub(crate) mod shims;
pub(crate) mod validation;

pub use document::{ContentMap, Operation, PathItem, RequestBodySpec, ResponseSpec, SpecDocument};
pub use models::{HttpMethod, ParamSource, Parameter};
pub use schemas::{AdditionalProperties, Schema, SchemaType};
