//! Property tests for path normalization, resolution and repeatable validation.

use openapi_conformance::{normalize_path, CanonicalMessage, ValidatorBuilder, ValidatorError};
use proptest::prelude::*;

const SPEC: &str = include_str!("fixtures/openapi.yaml");

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,8}"
}

/// Bodies for `POST /test`, passing and failing.
fn foo_body() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        "[a-z]{0,6}".prop_map(|v| serde_json::json!({ "foo": v })),
        "[a-z]{0,6}".prop_map(|v| serde_json::json!({ "baz": v })),
        any::<i64>().prop_map(|v| serde_json::json!({ "foo": v })),
    ]
}

fn outcome(result: Result<bool, ValidatorError>) -> Result<bool, String> {
    result.map_err(|err| err.to_string())
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "[/a-z?#=&]{0,24}") {
        let once = normalize_path(&raw);
        prop_assert!(once.starts_with('/'));
        prop_assert!(!once.starts_with("//"));
        prop_assert!(!once.contains('?'));
        prop_assert!(!once.contains('#'));
        prop_assert_eq!(normalize_path(&once), once.clone());
    }

    #[test]
    fn leading_slash_is_optional(segments in prop::collection::vec(segment(), 1..4)) {
        let bare = segments.join("/");
        prop_assert_eq!(normalize_path(&bare), format!("/{}", bare));
    }

    #[test]
    fn any_user_id_resolves(id in 1u32..1_000_000) {
        let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();
        let body = serde_json::json!({"id": id, "name": "n"});
        let path = format!("users/{}", id);
        prop_assert!(validator.get(CanonicalMessage::response(200).with_json(body), &path).unwrap());
    }

    #[test]
    fn unknown_paths_report_input_verbatim(name in "[a-z]{3,10}") {
        prop_assume!(name != "test" && name != "users");
        let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();
        let err = validator.validate(CanonicalMessage::response(200), &name, "get").unwrap_err();
        prop_assert!(matches!(err, ValidatorError::OperationNotFound { .. }), "unexpected error");
        prop_assert_eq!(
            err.to_string(),
            format!("OpenAPI spec contains no such operation [{},get]", name)
        );
    }

    #[test]
    fn validation_is_repeatable(body in foo_body(), path in prop_oneof![Just("/test"), Just("test")]) {
        let validator = ValidatorBuilder::from_yaml(SPEC).build().unwrap();
        let message = CanonicalMessage::request("post", "/test").with_json(body.clone());

        let first = outcome(validator.validate(&message, path, "post"));
        let second = outcome(validator.validate(&message, path, "post"));
        prop_assert_eq!(&first, &second);

        let expected_ok = body.get("foo").is_some_and(serde_json::Value::is_string);
        prop_assert_eq!(first.is_ok(), expected_ok);
    }
}
