#![deny(missing_docs)]

//! # Operation Resolver
//!
//! Maps a (path, method) pair to the operation declared in a `SpecDocument`.
//!
//! - The path gets exactly one leading `/`, and any query string or fragment
//!   is dropped, so `"test"` and `"/test"` resolve identically.
//! - A `{name}` segment matches any single non-empty segment. Literal segments
//!   match exactly (case-sensitive).
//! - Segments mixing literals and parameters (`{file}.json`) are matched with a
//!   regular expression compiled at load time.
//! - When several templates match, the one with the fewest templated segments
//!   wins. Ties go to the template whose first parameter appears latest, then
//!   to lexicographic template order.

use crate::error::{ValidatorError, ValidatorResult};
use crate::oas::document::{Operation, SpecDocument};
use crate::oas::models::HttpMethod;
use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::cmp::Reverse;

/// One `/`-separated segment of a path template.
#[derive(Debug, Clone)]
pub enum TemplateSegment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// `{name}`: captures the whole segment.
    Param(String),
    /// A segment mixing text and parameters, e.g. `{name}.{ext}`.
    Mixed {
        /// Anchored expression with one capture group per name.
        regex: Regex,
        /// Parameter names in capture order.
        names: Vec<String>,
    },
}

/// A compiled path template such as `/users/{id}/posts`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<TemplateSegment>,
}

impl PathTemplate {
    /// Compiles a template. Fails only when a mixed segment cannot be turned into a regex.
    pub fn parse(raw: &str) -> Result<Self, regex::Error> {
        let segments = split_segments(raw)
            .map(parse_segment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written in the document.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of segments that are not plain literals.
    pub fn templated_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| !matches!(s, TemplateSegment::Literal(_)))
            .count()
    }

    fn specificity(&self) -> (usize, Reverse<usize>) {
        let first_param = self
            .segments
            .iter()
            .position(|s| !matches!(s, TemplateSegment::Literal(_)))
            .unwrap_or(self.segments.len());
        (self.templated_segments(), Reverse(first_param))
    }

    /// Matches a normalized path, returning the percent-decoded parameter values.
    pub fn captures(&self, path: &str) -> Option<IndexMap<String, String>> {
        let parts: Vec<&str> = split_segments(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = IndexMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                TemplateSegment::Literal(text) => {
                    if text != part {
                        return None;
                    }
                }
                TemplateSegment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), decode(part));
                }
                TemplateSegment::Mixed { regex, names } => {
                    let caps = regex.captures(part)?;
                    for (idx, name) in names.iter().enumerate() {
                        let value = caps.get(idx + 1)?.as_str();
                        params.insert(name.clone(), decode(value));
                    }
                }
            }
        }
        Some(params)
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedOperation<'a> {
    /// The matched operation.
    pub operation: &'a Operation,
    /// The template that matched.
    pub template: &'a PathTemplate,
    /// Parameter values captured from the resolved path.
    pub path_params: IndexMap<String, String>,
}

/// Ensures exactly one leading `/` and strips any query string or fragment.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    format!("/{}", path[..end].trim_start_matches('/'))
}

/// Resolves `path` + `method` to an operation of `document`.
///
/// `OperationNotFound` carries `path` and `method` exactly as given.
pub fn resolve<'a>(
    document: &'a SpecDocument,
    path: &str,
    method: &str,
) -> ValidatorResult<ResolvedOperation<'a>> {
    let not_found = || ValidatorError::OperationNotFound {
        path: path.to_string(),
        method: method.to_string(),
    };

    let http_method = HttpMethod::from_token(method).ok_or_else(not_found)?;
    let normalized = normalize_path(path);

    // A caller passing the template itself ("/test/{id}") gets that template.
    if let Some(item) = document.path_item(&normalized) {
        if let Some(operation) = item.operation(http_method) {
            tracing::debug!(template = %normalized, method = %http_method, "resolved operation");
            return Ok(ResolvedOperation {
                operation,
                template: item.template(),
                path_params: IndexMap::new(),
            });
        }
    }

    let best = document
        .paths()
        .filter_map(|(_, item)| {
            let operation = item.operation(http_method)?;
            let params = item.template().captures(&normalized)?;
            tracing::trace!(candidate = item.template().as_str(), "template matches");
            Some(ResolvedOperation {
                operation,
                template: item.template(),
                path_params: params,
            })
        })
        .min_by(|a, b| {
            a.template
                .specificity()
                .cmp(&b.template.specificity())
                .then_with(|| a.template.as_str().cmp(b.template.as_str()))
        })
        .ok_or_else(not_found)?;

    tracing::debug!(
        template = best.template.as_str(),
        method = %http_method,
        "resolved operation"
    );
    Ok(best)
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

fn parse_segment(segment: &str) -> Result<TemplateSegment, regex::Error> {
    if !segment.contains('{') {
        return Ok(TemplateSegment::Literal(segment.to_string()));
    }

    let whole = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.contains(['{', '}']));
    if let Some(name) = whole {
        return Ok(TemplateSegment::Param(name.to_string()));
    }

    let mut pattern = String::from("^");
    let mut names = Vec::new();
    let mut rest = segment;
    while let Some(start) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..start]));
        let after = &rest[start + 1..];
        let end = after.find('}').unwrap_or(after.len());
        names.push(after[..end].to_string());
        pattern.push_str("(.+?)");
        rest = after.get(end + 1..).unwrap_or("");
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    Ok(TemplateSegment::Mixed {
        regex: Regex::new(&pattern)?,
        names,
    })
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
