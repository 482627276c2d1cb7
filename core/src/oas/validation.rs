#![deny(missing_docs)]

//! # OpenAPI Validation
//!
//! Helper functions that enforce structural requirements from the OpenAPI 3.x
//! specification before the document model is built.
//!
//! Checks include:
//! - The document declares an `openapi` 3.x version (Swagger 2.0 is rejected).
//! - `info.title` and `info.version` are non-empty.
//! - Path templates start with `/` and have balanced braces.
//! - Templates that only differ in parameter names are rejected as duplicates.

use crate::error::{ValidatorError, ValidatorResult};
use crate::oas::ref_utils::pointer_child;
use crate::oas::shims::ShimOpenApi;
use std::collections::HashMap;

/// Validates required root-level fields for an OpenAPI document.
pub(crate) fn validate_openapi_root(openapi: &ShimOpenApi) -> ValidatorResult<()> {
    if openapi.swagger.is_some() && openapi.openapi.is_none() {
        return Err(ValidatorError::invalid(
            "#/swagger",
            "Swagger 2.0 documents are not supported",
        ));
    }

    let Some(version) = &openapi.openapi else {
        return Err(ValidatorError::invalid(
            "#",
            "OpenAPI document missing required 'openapi' version",
        ));
    };
    if !version.starts_with("3.") {
        return Err(ValidatorError::invalid(
            "#/openapi",
            format!("Unsupported OpenAPI version '{}'", version),
        ));
    }

    validate_info_fields(openapi)?;
    validate_path_templates(openapi)?;

    Ok(())
}

fn validate_info_fields(openapi: &ShimOpenApi) -> ValidatorResult<()> {
    let Some(info) = &openapi.info else {
        return Err(ValidatorError::invalid(
            "#",
            "OpenAPI document missing required 'info' object",
        ));
    };

    if info.title.trim().is_empty() {
        return Err(ValidatorError::invalid(
            "#/info/title",
            "Info.title must be a non-empty string",
        ));
    }

    if info.version.trim().is_empty() {
        return Err(ValidatorError::invalid(
            "#/info/version",
            "Info.version must be a non-empty string",
        ));
    }

    Ok(())
}

/// Validates path keys and rejects templates that are equivalent once
/// parameter names are ignored (`/pets/{id}` vs `/pets/{name}`).
pub(crate) fn validate_path_templates(openapi: &ShimOpenApi) -> ValidatorResult<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for path in openapi.paths.items.keys() {
        let pointer = pointer_child("#/paths", path);
        if !path.starts_with('/') {
            return Err(ValidatorError::invalid(
                pointer,
                format!("Path '{}' must begin with '/'", path),
            ));
        }
        if !braces_balanced(path) {
            return Err(ValidatorError::invalid(
                pointer,
                format!("Path '{}' has unbalanced template braces", path),
            ));
        }

        let shape = template_shape(path);
        if let Some(previous) = seen.insert(shape, path) {
            return Err(ValidatorError::invalid(
                pointer,
                format!("Path '{}' is equivalent to '{}'", path, previous),
            ));
        }
    }

    Ok(())
}

fn braces_balanced(path: &str) -> bool {
    let mut open = false;
    for c in path.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            '/' if open => return false,
            _ => {}
        }
    }
    !open
}

/// `/pets/{petId}/toys` -> `/pets/{}/toys`
fn template_shape(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_param = false;
    for c in path.chars() {
        match c {
            '{' => {
                in_param = true;
                out.push_str("{}");
            }
            '}' => in_param = false,
            _ if in_param => {}
            _ => out.push(c),
        }
    }
    out
}
