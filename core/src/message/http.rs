//! # `http` Adapters
//!
//! `IntoCanonical` for the `http` crate's `Request` and `Response`, which is
//! what hyper, axum and reqwest-based test clients hand around.

use crate::error::{ValidatorError, ValidatorResult};
use crate::message::{CanonicalMessage, IntoCanonical, MessageKind};
use ::http::header::HeaderMap;

impl<B: AsRef<[u8]>> IntoCanonical for &::http::Request<B> {
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage> {
        let headers = header_pairs(self.headers())?;
        Ok(CanonicalMessage::from_parts(
            MessageKind::Request {
                method: self.method().as_str().to_string(),
            },
            &self.uri().to_string(),
            headers,
            self.body().as_ref(),
        ))
    }
}

impl<B: AsRef<[u8]>> IntoCanonical for &::http::Response<B> {
    fn into_canonical(self) -> ValidatorResult<CanonicalMessage> {
        let headers = header_pairs(self.headers())?;
        Ok(CanonicalMessage::from_parts(
            MessageKind::Response {
                status: self.status().as_u16(),
            },
            "/",
            headers,
            self.body().as_ref(),
        ))
    }
}

fn header_pairs(headers: &HeaderMap) -> ValidatorResult<Vec<(&str, &str)>> {
    headers
        .iter()
        .map(|(name, value)| {
            value
                .to_str()
                .map(|v| (name.as_str(), v))
                .map_err(|_| {
                    ValidatorError::MalformedMessage(format!(
                        "Header '{}' is not valid visible ASCII",
                        name
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBody;
    use serde_json::json;

    #[test]
    fn test_request_adapter() {
        let request = ::http::Request::builder()
            .method("POST")
            .uri("http://localhost/test?page=2")
            .header("Content-Type", "application/json")
            .body(r#"{"foo":"bar"}"#)
            .unwrap();

        let msg = (&request).into_canonical().unwrap();
        assert_eq!(
            msg.kind,
            MessageKind::Request {
                method: "POST".into()
            }
        );
        assert_eq!(msg.path, "/test");
        assert_eq!(msg.query.as_deref(), Some("page=2"));
        assert_eq!(msg.content_type.as_deref(), Some("application/json"));
        assert_eq!(msg.body, MessageBody::Structured(json!({"foo": "bar"})));
    }

    #[test]
    fn test_response_adapter() {
        let response = ::http::Response::builder()
            .status(404)
            .header("content-type", "application/problem+json")
            .body(br#"{"title":"missing"}"#.to_vec())
            .unwrap();

        let msg = (&response).into_canonical().unwrap();
        assert_eq!(msg.kind, MessageKind::Response { status: 404 });
        assert_eq!(msg.body, MessageBody::Structured(json!({"title": "missing"})));
    }

    #[test]
    fn test_empty_body_is_absent() {
        let response = ::http::Response::builder().status(204).body(Vec::new()).unwrap();
        let msg = (&response).into_canonical().unwrap();
        assert!(msg.body.is_empty());
        assert!(msg.content_type.is_none());
    }

    #[test]
    fn test_opaque_header_is_rejected() {
        let mut response = ::http::Response::new(Vec::new());
        response.headers_mut().insert(
            "x-bin",
            ::http::HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap(),
        );
        let err = (&response).into_canonical().unwrap_err();
        assert!(matches!(err, ValidatorError::MalformedMessage(_)));
    }
}
