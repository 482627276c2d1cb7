//! # `actix-web` Adapters
//!
//! `IntoCanonical` for `actix_web::HttpResponse` (with an in-memory body) and
//! for an `HttpRequest` paired with the payload bytes it was sent with.

use crate::error::{ValidatorError, ValidatorResult};
use crate::message::{CanonicalMessage, IntoCanonical, MessageKind};
use actix_web::body::MessageBody as _;
use actix_web::http::header::HeaderMap;
use actix_web::{HttpRequest, HttpResponse};

impl IntoCanonical for HttpResponse {
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage> {
        let status = self.status().as_u16();
        let headers = owned_header_pairs(self.headers())?;
        let body = self.into_body().try_into_bytes().map_err(|_| {
            ValidatorError::MalformedMessage(
                "Response body is streamed and cannot be read synchronously".into(),
            )
        })?;

        Ok(CanonicalMessage::from_parts(
            MessageKind::Response { status },
            "/",
            headers.iter().map(|(n, v)| (n.as_str(), v.as_str())),
            &body,
        ))
    }
}

impl IntoCanonical for (&HttpRequest, &[u8]) {
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage> {
        let (request, body) = self;
        let headers = owned_header_pairs(request.headers())?;
        Ok(CanonicalMessage::from_parts(
            MessageKind::Request {
                method: request.method().as_str().to_string(),
            },
            &request.uri().to_string(),
            headers.iter().map(|(n, v)| (n.as_str(), v.as_str())),
            body,
        ))
    }
}

fn owned_header_pairs(headers: &HeaderMap) -> ValidatorResult<Vec<(String, String)>> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().map_err(|_| {
                ValidatorError::MalformedMessage(format!(
                    "Header '{}' is not valid visible ASCII",
                    name
                ))
            })?;
            Ok((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}
