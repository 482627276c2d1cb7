#![deny(missing_docs)]

//! # Message Normalization
//!
//! The representation-agnostic HTTP message the validator works on, and the
//! `IntoCanonical` boundary every framework adapter implements.
//!
//! - **http**: adapters for `http::Request` / `http::Response`.
//! - **actix**: adapters for `actix-web` requests and responses.

#[cfg(feature = "actix")]
pub mod actix;
#[cfg(feature = "http")]
pub mod http;

use crate::error::ValidatorResult;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Whether a message is a request or a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// A request, with the method token it was sent with.
    Request {
        /// Method as carried by the message (informational).
        method: String,
    },
    /// A response.
    Response {
        /// HTTP status code.
        status: u16,
    },
}

/// A parsed message body.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// No payload.
    Empty,
    /// A JSON document, or the text of a `text/*` body.
    Structured(Value),
    /// Bytes the normalizer could not (or would not) parse.
    Opaque(Vec<u8>),
}

impl MessageBody {
    /// Parses a payload according to its content type.
    ///
    /// JSON types (`application/json`, `*+json`) are parsed; unparsable JSON
    /// stays opaque so the validator can report it. `text/*` becomes a string.
    /// A payload without a content type stays opaque.
    pub fn parse(content_type: Option<&str>, bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return MessageBody::Empty;
        }

        match content_type {
            Some(ct) if is_json_media_type(ct) => serde_json::from_slice(bytes)
                .map(MessageBody::Structured)
                .unwrap_or_else(|_| MessageBody::Opaque(bytes.to_vec())),
            Some(ct) if media_type_essence(ct).starts_with("text/") => {
                match std::str::from_utf8(bytes) {
                    Ok(text) => MessageBody::Structured(Value::String(text.to_string())),
                    Err(_) => MessageBody::Opaque(bytes.to_vec()),
                }
            }
            Some(_) | None => MessageBody::Opaque(bytes.to_vec()),
        }
    }

    /// True for `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, MessageBody::Empty)
    }
}

/// The canonical form of an HTTP request or response.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMessage {
    /// Request (with method) or response (with status).
    pub kind: MessageKind,
    /// Request path without query string; `/` for responses unless set.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Headers keyed by lower-cased name. Repeated headers are joined with `, `.
    pub headers: BTreeMap<String, String>,
    /// Media type essence of the `content-type` header.
    pub content_type: Option<String>,
    /// Parsed body.
    pub body: MessageBody,
}

impl CanonicalMessage {
    /// A request for `uri`, which may be absolute (`http://host/a?b=c`) or a path.
    pub fn request(method: &str, uri: &str) -> Self {
        let (path, query) = split_uri(uri);
        Self {
            kind: MessageKind::Request {
                method: method.to_ascii_uppercase(),
            },
            path,
            query,
            headers: BTreeMap::new(),
            content_type: None,
            body: MessageBody::Empty,
        }
    }

    /// A response with the given status.
    pub fn response(status: u16) -> Self {
        Self {
            kind: MessageKind::Response { status },
            path: "/".to_string(),
            query: None,
            headers: BTreeMap::new(),
            content_type: None,
            body: MessageBody::Empty,
        }
    }

    /// Adds a header. A `content-type` header also sets `content_type`.
    ///
    /// Set the content type before calling `with_body`, which parses according to it.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "content-type" {
            self.content_type = Some(media_type_essence(value));
        }
        self.headers
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        self
    }

    /// Sets a JSON body, defaulting the content type to `application/json`.
    pub fn with_json(mut self, body: Value) -> Self {
        if self.content_type.is_none() {
            self = self.with_header("content-type", "application/json");
        }
        self.body = MessageBody::Structured(body);
        self
    }

    /// Sets a raw payload, parsed according to the current content type.
    pub fn with_body(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.body = MessageBody::parse(self.content_type.as_deref(), bytes.as_ref());
        self
    }

    /// Builds a message from adapter-provided parts.
    pub fn from_parts<'h>(
        kind: MessageKind,
        uri: &str,
        headers: impl IntoIterator<Item = (&'h str, &'h str)>,
        body: &[u8],
    ) -> Self {
        let (path, query) = split_uri(uri);
        let mut message = Self {
            kind,
            path,
            query,
            headers: BTreeMap::new(),
            content_type: None,
            body: MessageBody::Empty,
        };
        for (name, value) in headers {
            message = message.with_header(name, value);
        }
        message.with_body(body)
    }

    /// A header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for requests.
    pub fn is_request(&self) -> bool {
        matches!(self.kind, MessageKind::Request { .. })
    }
}

/// Conversion of a framework-specific HTTP message into a `CanonicalMessage`.
///
/// Implement this for a new message representation instead of touching the validator.
pub trait IntoCanonical {
    /// Performs the conversion.
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage>;
}

impl IntoCanonical for CanonicalMessage {
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage> {
        Ok(self)
    }
}

impl IntoCanonical for &CanonicalMessage {
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage> {
        Ok(self.clone())
    }
}

/// Lower-cased media type without parameters (`Application/JSON; charset=utf-8` -> `application/json`).
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `application/json` or any `+json` structured syntax suffix.
pub fn is_json_media_type(content_type: &str) -> bool {
    let essence = media_type_essence(content_type);
    essence == "application/json" || essence.ends_with("+json")
}

/// Splits a URI or path into (path, query).
fn split_uri(uri: &str) -> (String, Option<String>) {
    if let Ok(url) = Url::parse(uri) {
        if url.has_host() {
            return (url.path().to_string(), url.query().map(str::to_string));
        }
    }

    let without_fragment = uri.split('#').next().unwrap_or_default();
    match without_fragment.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (without_fragment.to_string(), None),
    }
}
