//! Normalization of chain payloads whose layout shifts between runtime
//! versions and batching depths.
//!
//! Values decoded from the chain wrap versioned structures into single-key
//! `{"V0": {...}}` objects and nest the same logical field at different
//! depths. Everything that reads raw payloads goes through this module
//! instead of assuming a fixed path.

use crate::JsonValue;


/// Strips single-key `{"V<digits>": inner}` wrappers until a non-versioned value is reached.
pub fn unwrap_versioned(mut value: &JsonValue) -> &JsonValue {
    loop {
        let JsonValue::Object(obj) = value else {
            return value
        };
        if obj.len() != 1 {
            return value
        }
        let Some((key, inner)) = obj.iter().next() else {
            return value
        };
        if !is_version_tag(key) {
            return value
        }
        value = inner
    }
}


fn is_version_tag(key: &str) -> bool {
    let Some(digits) = key.strip_prefix('V') else {
        return false
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}


/// Searches an arbitrarily nested value for the first non-null entry under any of `keys`.
///
/// Objects are inspected before their children, and children are visited in document order.
/// Within one object, `keys` are tried in the given order. JSON values form a tree,
/// so the traversal always terminates.
pub fn deep_find_by_key<'a>(value: &'a JsonValue, keys: &[&str]) -> Option<&'a JsonValue> {
    let mut stack = vec![value];

    while let Some(item) = stack.pop() {
        match item {
            JsonValue::Object(obj) => {
                for key in keys {
                    match obj.get(*key) {
                        Some(JsonValue::Null) | None => {},
                        Some(found) => return Some(found)
                    }
                }
                stack.extend(obj.values().rev().filter(|v| is_container(v)));
            },
            JsonValue::Array(list) => {
                stack.extend(list.iter().rev().filter(|v| is_container(v)));
            },
            _ => {}
        }
    }

    None
}


fn is_container(value: &JsonValue) -> bool {
    value.is_object() || value.is_array()
}


/// Returns the first candidate that is present and not null.
pub fn coalesce<'a, I>(candidates: I) -> Option<&'a JsonValue>
where
    I: IntoIterator<Item = Option<&'a JsonValue>>
{
    candidates.into_iter().flatten().find(|v| !v.is_null())
}


/// Follows a fixed path of object keys, unwrapping versioned wrappers on the way.
pub fn get_path<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = unwrap_versioned(value);
    for key in path {
        current = unwrap_versioned(current.as_object()?.get(*key)?);
    }
    (!current.is_null()).then_some(current)
}


/// Looks up a field stored under either of its snake_case or camelCase names.
pub fn field<'a>(value: &'a JsonValue, names: &[&str]) -> Option<&'a JsonValue> {
    let obj = unwrap_versioned(value).as_object()?;
    coalesce(names.iter().map(|name| obj.get(*name)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;


    #[test]
    fn unwraps_nested_versions() {
        let value = json!({"V3": {"V1": 42}});
        assert_eq!(unwrap_versioned(&value), &json!(42));

        let value = json!({"V0": {"domainId": 1, "operatorId": 2}});
        assert_eq!(unwrap_versioned(&value), &json!({"domainId": 1, "operatorId": 2}));
    }

    #[test]
    fn keeps_non_versioned_values() {
        for value in [
            json!({}),
            json!({"V1": 1, "V2": 2}),
            json!({"Va": 1}),
            json!({"V": 1}),
            json!({"header": {"V0": 1}}),
            json!([{"V0": 1}]),
            json!("V0"),
            json!(null),
        ] {
            assert_eq!(unwrap_versioned(&value), &value);
        }
    }

    #[test]
    fn deep_find_prefers_shallow_and_earlier_matches() {
        let value = json!({
            "call": {
                "args": [
                    {"other": 1},
                    {"opaque_bundle": {"sealed_header": {"header": "first"}}},
                    {"sealedHeader": "second"}
                ]
            },
            "sealed_header": null
        });
        assert_eq!(
            deep_find_by_key(&value, &["sealed_header", "sealedHeader"]),
            Some(&json!({"header": "first"}))
        );
        assert_eq!(deep_find_by_key(&value, &["missing"]), None);
        assert_eq!(deep_find_by_key(&json!(5), &["any"]), None);
    }

    #[test]
    fn coalesce_skips_null_and_absent() {
        let a = json!(null);
        let b = json!(0);
        assert_eq!(coalesce([None, Some(&a), Some(&b)]), Some(&b));
        assert_eq!(coalesce([None, Some(&a)]), None);
        assert_eq!(coalesce(std::iter::empty()), None);
    }

    #[test]
    fn path_lookup_sees_through_versions() {
        let value = json!({"V0": {"receipt": {"V1": {"domainBlockNumber": "1,024"}}}});
        assert_eq!(
            get_path(&value, &["receipt", "domainBlockNumber"]),
            Some(&json!("1,024"))
        );
        assert_eq!(get_path(&value, &["receipt", "missing"]), None);
        assert!(field(&value, &["receipt"]).is_some());
    }

    fn scalar() -> impl Strategy<Value = JsonValue> {
        prop_oneof![
            any::<i64>().prop_map(JsonValue::from),
            "[a-z0-9]{0,8}".prop_map(JsonValue::from),
            any::<bool>().prop_map(JsonValue::from),
            Just(JsonValue::Null),
        ]
    }

    proptest! {
        #[test]
        fn strips_any_version_stack(x in scalar(), versions in prop::collection::vec(0u32..100, 0..5)) {
            let mut value = x.clone();
            for v in versions {
                value = json!({ format!("V{}", v): value });
            }
            prop_assert_eq!(unwrap_versioned(&value), &x);
        }
    }
}
