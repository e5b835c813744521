//! Canonicalization of evaluator output.
//!
//! The public JSON value type preserves object insertion order (needed
//! so style catalogs keep declaration order), which means maps built
//! during evaluation would otherwise reflect incidental construction
//! order. This pass sorts every object's keys recursively so that
//! serializing the same result twice is byte-identical, independent of
//! the underlying container.

use serde_json::{Map, Value};

/// Recursively sorts the keys of every JSON object in `value`.
pub fn canonicalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::new();
            for (key, mut child) in entries {
                canonicalize(&mut child);
                sorted.insert(key, child);
            }
            *map = sorted;
        }
        Value::Array(items) => {
            for item in items {
                canonicalize(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_recursively() {
        let mut value = json!({
            "z": 1,
            "a": { "d": [ { "y": 1, "x": 2 } ], "c": 3 }
        });
        canonicalize(&mut value);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"a":{"c":3,"d":[{"x":2,"y":1}]},"z":1}"#
        );
    }

    #[test]
    fn canonical_form_is_stable() {
        let mut a = json!({ "b": 1, "a": 2 });
        let mut b = json!({ "a": 2, "b": 1 });
        canonicalize(&mut a);
        canonicalize(&mut b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
