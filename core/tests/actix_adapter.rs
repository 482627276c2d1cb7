#![cfg(feature = "actix")]

use actix_web::http::Method;
use actix_web::test::TestRequest;
use actix_web::HttpResponse;
use openapi_conformance::ValidatorBuilder;
use pretty_assertions::assert_eq;

const SPEC: &str = include_str!("fixtures/openapi.yaml");

#[test]
fn test_request_outcomes() {
    let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();

    let delete = TestRequest::default()
        .method(Method::DELETE)
        .uri("/test")
        .to_http_request();
    let empty: &[u8] = b"";
    assert!(validator.validate((&delete, empty), "/test", "delete").unwrap());

    let post = TestRequest::post()
        .uri("/test")
        .insert_header(("content-type", "application/json"))
        .to_http_request();
    let valid: &[u8] = br#"{"foo":"bar"}"#;
    assert!(validator.post((&post, valid), "/test").unwrap());

    let invalid: &[u8] = br#"{"baz":"bar"}"#;
    let err = validator.post((&post, invalid), "/test").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Body does not match schema for content-type \"application/json\" for Request [post /test]: \
         Keyword validation failed: Required property 'foo' must be present in the object Field: foo"
    );
}

#[test]
fn test_response_outcomes() {
    let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();

    let ok = HttpResponse::Ok()
        .content_type("application/json")
        .body(r#"{"foo":"bar"}"#);
    assert!(validator.get(ok, "/test").unwrap());

    let bad = HttpResponse::Ok()
        .content_type("application/json")
        .body(r#"{"baz":"bar"}"#);
    let err = validator.get(bad, "/test").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Body does not match schema for content-type \"application/json\" for Response [get /test 200]: \
         Keyword validation failed: Required property 'foo' must be present in the object Field: foo"
    );

    for method in ["delete", "head", "options", "patch", "post", "put", "trace"] {
        let empty = HttpResponse::Ok().finish();
        assert!(validator.validate(empty, "/test", method).unwrap(), "{}", method);
    }
}
