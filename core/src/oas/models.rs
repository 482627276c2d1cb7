#![deny(missing_docs)]

//! # OpenAPI Models
//!
//! Small value types shared by the document model, the resolver and the
//! validator: HTTP methods and parameter definitions.

use crate::oas::schemas::Schema;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// An HTTP method an OpenAPI Path Item can declare an operation for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
}

impl HttpMethod {
    /// Every supported method, in Path Item declaration order.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    /// Parses a method token case-insensitively (`"get"`, `"GET"`, `"Get"`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            "TRACE" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    /// Uppercase token, as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Lowercase token, as used for Path Item keys and diagnostics.
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::from_token(s).ok_or_else(|| format!("Unknown HTTP method '{}'", s))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The source location of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// Path.
    Path,
    /// Query.
    Query,
    /// Header.
    Header,
    /// Cookie.
    Cookie,
}

impl ParamSource {
    /// Parses the `in` field of a Parameter Object.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "path" => Some(ParamSource::Path),
            "query" => Some(ParamSource::Query),
            "header" => Some(ParamSource::Header),
            "cookie" => Some(ParamSource::Cookie),
            _ => None,
        }
    }

    /// The `in` keyword for this location.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
            ParamSource::Header => "header",
            ParamSource::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved Parameter Object.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name (e.g. "id").
    pub name: String,
    /// Where the value is carried.
    pub source: ParamSource,
    /// Always true for path parameters.
    pub required: bool,
    /// Schema of the value, if declared.
    pub schema: Option<Arc<Schema>>,
}

impl Parameter {
    /// Whether two parameters describe the same value (same name and location).
    ///
    /// Header names compare case-insensitively.
    pub fn same_slot(&self, other: &Parameter) -> bool {
        if self.source != other.source {
            return false;
        }
        match self.source {
            ParamSource::Header => self.name.eq_ignore_ascii_case(&other.name),
            _ => self.name == other.name,
        }
    }
}
