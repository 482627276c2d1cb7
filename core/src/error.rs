//! # Error Handling
//!
//! Provides the unified `ValidatorError` enum returned by document loading and
//! message validation.

use crate::validation::{MessageTarget, Violation};
use derive_more::{Display, From};
use std::fmt;

/// The Global Error Enum.
///
/// Load-time failures (`InvalidSpecDocument`, `Io`) abort construction of a
/// validator. Every other variant is produced by a single validation call.
#[derive(Debug, Display, From)]
pub enum ValidatorError {
    /// The OpenAPI document is malformed or has unresolvable references.
    #[from(ignore)]
    #[display("Invalid OpenAPI document at '{pointer}': {reason}")]
    InvalidSpecDocument {
        /// JSON pointer to the offending node (e.g. `#/paths/~1test/post`).
        pointer: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No operation matches the given path and method.
    #[from(ignore)]
    #[display("OpenAPI spec contains no such operation [{path},{method}]")]
    OperationNotFound {
        /// The path exactly as the caller supplied it.
        path: String,
        /// The method exactly as the caller supplied it.
        method: String,
    },

    /// The operation exists but declares no response for the message status.
    #[from(ignore)]
    #[display("OpenAPI spec contains no response for status {status} in [{path},{method}]")]
    ResponseNotDeclared {
        /// The path exactly as the caller supplied it.
        path: String,
        /// The method exactly as the caller supplied it.
        method: String,
        /// The response status code.
        status: u16,
    },

    /// A body is present but no schema is declared for its content type.
    #[from(ignore)]
    #[display("Content-Type \"{content_type}\" is not expected for {target}")]
    UnsupportedContentType {
        /// The message the body belongs to.
        target: MessageTarget,
        /// The message content type (empty when the header is missing).
        content_type: String,
    },

    /// One or more schema keywords failed.
    #[display("{_0}")]
    SchemaViolation(SchemaMismatch),

    /// A message adapter could not read the underlying HTTP message.
    #[from(ignore)]
    #[display("Malformed HTTP message: {_0}")]
    MalformedMessage(String),

    /// Wrapper for standard IO errors raised while reading a document file.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for ValidatorError {}

impl ValidatorError {
    /// Shorthand for building an `InvalidSpecDocument` error.
    pub(crate) fn invalid(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidatorError::InvalidSpecDocument {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    /// Returns every collected violation for `SchemaViolation`, otherwise an empty slice.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidatorError::SchemaViolation(mismatch) => &mismatch.violations,
            _ => &[],
        }
    }
}

/// Helper type alias for Result using ValidatorError.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Which part of the message failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchScope {
    /// The body, checked against the schema of the given content type.
    Body {
        /// Media type the schema was selected for.
        content_type: String,
    },
    /// Path, query, header or cookie parameters.
    Parameters,
}

/// The violations collected for one message, in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMismatch {
    /// Body or parameters.
    pub scope: MismatchScope,
    /// The operation the message was checked against.
    pub target: MessageTarget,
    /// All violations; never empty when carried by an error.
    pub violations: Vec<Violation>,
}

impl SchemaMismatch {
    /// The violation that determines the rendered message.
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            MismatchScope::Body { content_type } => write!(
                f,
                "Body does not match schema for content-type \"{}\" for {}",
                content_type, self.target
            )?,
            MismatchScope::Parameters => {
                write!(f, "Parameters do not match schema for {}", self.target)?
            }
        }

        let Some(first) = self.first() else {
            return Ok(());
        };
        write!(f, ": Keyword validation failed: {}", first.message)?;
        if !first.path.is_empty() {
            write!(f, " Field: {}", first.path)?;
        }
        Ok(())
    }
}
