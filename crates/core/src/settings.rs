//! Settings blobs and the shallow-merge rule used for tenant/application
//! configuration.

use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};

/// A settings blob: always a JSON object at the top level.
pub type Settings = Map<String, Value>;

/// Shallow merge: every top-level key of `overlay` replaces the same key of
/// `base`. Nested objects are replaced wholesale, not merged.
pub fn merge_settings(base: &Settings, overlay: &Settings) -> Settings {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Accept a JSON value as a settings blob.
///
/// Anything other than an object is rejected; there is no way to express
/// "unset" through a patch.
pub fn settings_from_value(value: Value) -> DomainResult<Settings> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::bad_request(format!(
            "settings must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn obj(v: Value) -> Settings {
        settings_from_value(v).unwrap()
    }

    #[test]
    fn overlay_keys_win() {
        let merged = merge_settings(&obj(json!({"x": 0, "y": 2})), &obj(json!({"x": 1})));
        assert_eq!(Value::Object(merged), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn nested_objects_are_replaced_not_merged() {
        let merged = merge_settings(
            &obj(json!({"theme": {"color": "red", "font": "serif"}})),
            &obj(json!({"theme": {"color": "blue"}})),
        );
        assert_eq!(Value::Object(merged), json!({"theme": {"color": "blue"}}));
    }

    #[test]
    fn non_object_is_rejected() {
        for bad in [json!(null), json!([1, 2]), json!("x"), json!(3), json!(true)] {
            let err = settings_from_value(bad).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::BadRequest);
        }
    }

    fn small_settings() -> impl Strategy<Value = Settings> {
        prop::collection::btree_map("[a-e]", 0i64..5, 0..5).prop_map(|m| {
            m.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: merging the same overlay twice changes nothing further.
        #[test]
        fn merge_is_idempotent(base in small_settings(), overlay in small_settings()) {
            let once = merge_settings(&base, &overlay);
            let twice = merge_settings(&once, &overlay);
            prop_assert_eq!(once, twice);
        }

        /// Property: the result holds every key of both inputs, overlay values first.
        #[test]
        fn merge_keeps_all_keys(base in small_settings(), overlay in small_settings()) {
            let merged = merge_settings(&base, &overlay);
            for (k, v) in &overlay {
                prop_assert_eq!(merged.get(k), Some(v));
            }
            for (k, v) in &base {
                if !overlay.contains_key(k) {
                    prop_assert_eq!(merged.get(k), Some(v));
                }
            }
            prop_assert!(merged.len() <= base.len() + overlay.len());
        }
    }
}
