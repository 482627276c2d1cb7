#![deny(missing_docs)]

//! # Violations
//!
//! The structured record of one failed keyword, and the identity of the
//! message it was found in.

use crate::oas::models::HttpMethod;
use std::fmt;

/// Request or response, as rendered in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A request.
    Request,
    /// A response with its status code.
    Response(u16),
}

/// The operation a message was checked against.
///
/// Renders as `Request [post /test]` or `Response [get /test 200]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTarget {
    /// Request or response.
    pub direction: Direction,
    /// Operation method.
    pub method: HttpMethod,
    /// Operation path template.
    pub path: String,
}

impl MessageTarget {
    /// A request target.
    pub fn request(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            direction: Direction::Request,
            method,
            path: path.into(),
        }
    }

    /// A response target.
    pub fn response(method: HttpMethod, path: impl Into<String>, status: u16) -> Self {
        Self {
            direction: Direction::Response(status),
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Request => {
                write!(f, "Request [{} {}]", self.method.as_lowercase(), self.path)
            }
            Direction::Response(status) => write!(
                f,
                "Response [{} {} {}]",
                self.method.as_lowercase(),
                self.path,
                status
            ),
        }
    }
}

/// One step into a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// An object key.
    Property(String),
    /// An array index.
    Index(usize),
}

/// The location of a value inside a body, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyPath(Vec<PathSegment>);

impl BodyPath {
    /// A path of a single property.
    pub fn from_property(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Property(name.into())])
    }

    /// True for the body root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments, root first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// RFC 6901 rendering, e.g. `/items/0/name`.
    pub fn json_pointer(&self) -> String {
        self.0
            .iter()
            .map(|segment| match segment {
                PathSegment::Property(name) => {
                    format!("/{}", name.replace('~', "~0").replace('/', "~1"))
                }
                PathSegment::Index(idx) => format!("/{}", idx),
            })
            .collect()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

/// Dot-joined, as used in failure messages: `items.0.name`.
impl fmt::Display for BodyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Property(name) => f.write_str(name)?,
                PathSegment::Index(i) => write!(f, "{}", i)?,
            }
        }
        Ok(())
    }
}

/// One concrete way a message failed its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Where in the body (or which parameter).
    pub path: BodyPath,
    /// The schema keyword that failed (`type`, `required`, `enum`, ...).
    pub keyword: &'static str,
    /// Human-readable description.
    pub message: String,
    /// The operation the check ran against.
    pub target: MessageTarget,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.path.is_empty() {
            write!(f, " Field: {}", self.path)?;
        }
        Ok(())
    }
}
