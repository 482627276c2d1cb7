#![cfg(feature = "http")]

use openapi_conformance::{ValidatorBuilder, ValidatorError};
use pretty_assertions::assert_eq;

const SPEC: &str = include_str!("fixtures/openapi.yaml");

fn request(method: &str, body: &str) -> http::Request<Vec<u8>> {
    let mut builder = http::Request::builder()
        .method(method.to_ascii_uppercase().as_str())
        .uri("http://localhost/test");
    if !body.is_empty() {
        builder = builder.header("Content-Type", "application/json");
    }
    builder.body(body.as_bytes().to_vec()).unwrap()
}

fn response(body: &str) -> http::Response<String> {
    http::Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(body.to_string())
        .unwrap()
}

#[test]
fn test_request_outcomes() {
    let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();

    assert!(validator
        .validate(&request("delete", ""), "/test", "delete")
        .unwrap());
    assert!(validator
        .validate(&request("post", r#"{"foo":"bar"}"#), "/test", "post")
        .unwrap());

    let err = validator
        .validate(&request("delete", ""), "/test", "foo")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "OpenAPI spec contains no such operation [/test,foo]"
    );

    let err = validator
        .validate(&request("post", r#"{"baz":"bar"}"#), "/test", "post")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Body does not match schema for content-type \"application/json\" for Request [post /test]: \
         Keyword validation failed: Required property 'foo' must be present in the object Field: foo"
    );
}

#[test]
fn test_response_outcomes() {
    let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();

    assert!(validator.get(&response(r#"{"foo":"bar"}"#), "test").unwrap());

    let err = validator
        .get(&response(r#"{"baz":"bar"}"#), "/test")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Body does not match schema for content-type \"application/json\" for Response [get /test 200]: \
         Keyword validation failed: Required property 'foo' must be present in the object Field: foo"
    );
}

#[test]
fn test_invalid_json_body() {
    let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();
    let err = validator.get(&response("{oops"), "/test").unwrap_err();
    assert!(matches!(err, ValidatorError::SchemaViolation(_)));
    assert_eq!(err.violations()[0].keyword, "json");
}
