#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Helpers for walking local `$ref` JSON pointers (`#/components/...`) through
//! the raw document tree. External documents are never fetched.

use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Decodes a JSON Pointer segment (handles `~1`, `~0` and percent-encoding).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Escapes a key so it can be appended to a JSON pointer.
pub(crate) fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Appends an escaped key to a pointer (`#/paths` + `/test` -> `#/paths/~1test`).
pub(crate) fn pointer_child(base: &str, segment: &str) -> String {
    format!("{}/{}", base, escape_pointer_segment(segment))
}

/// Returns true if the `$ref` points into the current document.
pub(crate) fn is_local_ref(ref_str: &str) -> bool {
    ref_str == "#" || ref_str.starts_with("#/")
}

/// Looks up a local `$ref` (e.g. `#/components/schemas/User`) in the document root.
///
/// Returns `None` for external references or pointers that do not resolve.
pub(crate) fn resolve_local_ref<'a>(root: &'a Value, ref_str: &str) -> Option<&'a Value> {
    if !is_local_ref(ref_str) {
        return None;
    }
    let pointer = ref_str.trim_start_matches('#');
    if pointer.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for raw in pointer.trim_start_matches('/').split('/') {
        let segment = decode_pointer_segment(raw);
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Returns the `$ref` string of a Reference Object, if the node is one.
pub(crate) fn ref_target(node: &Value) -> Option<&str> {
    node.as_object()?.get("$ref")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_pointer_segment_percent_encoding() {
        let encoded = "User%20Profile~1details";
        let decoded = decode_pointer_segment(encoded);
        assert_eq!(decoded, "User Profile/details");
    }

    #[test]
    fn test_pointer_child_escapes_path_keys() {
        assert_eq!(pointer_child("#/paths", "/test/{id}"), "#/paths/~1test~1{id}");
        assert_eq!(pointer_child("#", "a~b"), "#/a~0b");
    }

    #[test]
    fn test_resolve_local_ref_walks_objects_and_arrays() {
        let root = json!({
            "components": {
                "schemas": {
                    "User": { "type": "object" },
                    "a/b": { "type": "string" }
                }
            },
            "list": [ { "x": 1 } ]
        });

        assert_eq!(
            resolve_local_ref(&root, "#/components/schemas/User"),
            Some(&json!({ "type": "object" }))
        );
        assert_eq!(
            resolve_local_ref(&root, "#/components/schemas/a~1b"),
            Some(&json!({ "type": "string" }))
        );
        assert_eq!(resolve_local_ref(&root, "#/list/0/x"), Some(&json!(1)));
        assert!(resolve_local_ref(&root, "#/components/schemas/Missing").is_none());
        assert!(resolve_local_ref(&root, "other.yaml#/components/schemas/User").is_none());
    }

    #[test]
    fn test_ref_target() {
        assert_eq!(ref_target(&json!({"$ref": "#/a"})), Some("#/a"));
        assert!(ref_target(&json!({"type": "string"})).is_none());
    }
}
