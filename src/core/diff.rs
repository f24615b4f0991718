//! Minimal JSON Patch diff between two vertex snapshots.

use serde_json::Value;

use super::patch::{escape_pointer, PatchOp};

/// Compute an ordered patch sequence transforming `prev` into `next`.
///
/// Objects diff per key, arrays per index with `/-` appends, so a scalar
/// change inside an array element never re-emits the whole array. An empty
/// result means the snapshots are canonically equal.
pub fn diff(prev: &Value, next: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_value(prev, next, "", &mut ops);
    ops
}

fn diff_value(prev: &Value, next: &Value, path: &str, ops: &mut Vec<PatchOp>) {
    if prev == next {
        return;
    }
    match (prev, next) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, prev_child) in a {
                let child_path = format!("{}/{}", path, escape_pointer(key));
                match b.get(key) {
                    Some(next_child) => diff_value(prev_child, next_child, &child_path, ops),
                    None => ops.push(PatchOp::Remove { path: child_path }),
                }
            }
            for (key, next_child) in b {
                if !a.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: format!("{}/{}", path, escape_pointer(key)),
                        value: next_child.clone(),
                    });
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let shared = a.len().min(b.len());
            for index in 0..shared {
                diff_value(&a[index], &b[index], &format!("{}/{}", path, index), ops);
            }
            for item in &b[shared..] {
                ops.push(PatchOp::Add {
                    path: format!("{}/-", path),
                    value: item.clone(),
                });
            }
            // Removes run from the tail down so earlier indices stay valid.
            for index in (shared..a.len()).rev() {
                ops.push(PatchOp::Remove {
                    path: format!("{}/{}", path, index),
                });
            }
        }
        _ => ops.push(PatchOp::Replace {
            path: path.to_string(),
            value: next.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::patch::apply_patches;
    use serde_json::json;

    fn roundtrip(prev: &Value, next: &Value) {
        let patches = diff(prev, next);
        let mut replayed = prev.clone();
        apply_patches(&mut replayed, &patches).unwrap();
        assert_eq!(&replayed, next, "patches: {:?}", patches);
    }

    #[test]
    fn equal_snapshots_produce_no_ops() {
        let value = json!({"id": "x", "aliases": [{"id": "a"}]});
        assert!(diff(&value, &value).is_empty());
    }

    #[test]
    fn changed_nested_leaf_emits_single_replace() {
        let prev = json!({"metadata": {"object": {"content": "old", "kept": 1}}});
        let next = json!({"metadata": {"object": {"content": "new", "kept": 1}}});
        assert_eq!(
            diff(&prev, &next),
            vec![PatchOp::Replace {
                path: "/metadata/object/content".into(),
                value: json!("new"),
            }]
        );
    }

    #[test]
    fn new_and_removed_keys_emit_add_and_remove() {
        let prev = json!({"keep": 1, "drop": 2});
        let next = json!({"keep": 1, "fresh": 3});
        let patches = diff(&prev, &next);
        assert_eq!(
            patches,
            vec![
                PatchOp::Remove { path: "/drop".into() },
                PatchOp::Add {
                    path: "/fresh".into(),
                    value: json!(3),
                },
            ]
        );
        roundtrip(&prev, &next);
    }

    #[test]
    fn array_append_uses_dash_path() {
        let prev = json!({"aliases": [{"id": "a"}]});
        let next = json!({"aliases": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(
            diff(&prev, &next),
            vec![PatchOp::Add {
                path: "/aliases/-".into(),
                value: json!({"id": "b"}),
            }]
        );
    }

    #[test]
    fn scalar_change_inside_element_stays_fine_grained() {
        let prev = json!({"aliases": [{"id": "a", "metadata": 1}, {"id": "b"}]});
        let next = json!({"aliases": [{"id": "a", "metadata": 2}, {"id": "b"}]});
        assert_eq!(
            diff(&prev, &next),
            vec![PatchOp::Replace {
                path: "/aliases/0/metadata".into(),
                value: json!(2),
            }]
        );
    }

    #[test]
    fn array_shrink_removes_from_the_tail() {
        let prev = json!({"list": [1, 2, 3, 4]});
        let next = json!({"list": [1, 2]});
        assert_eq!(
            diff(&prev, &next),
            vec![
                PatchOp::Remove { path: "/list/3".into() },
                PatchOp::Remove { path: "/list/2".into() },
            ]
        );
        roundtrip(&prev, &next);
    }

    #[test]
    fn type_change_replaces_the_node() {
        let prev = json!({"metadata": {"a": 1}});
        let next = json!({"metadata": [1]});
        assert_eq!(
            diff(&prev, &next),
            vec![PatchOp::Replace {
                path: "/metadata".into(),
                value: json!([1]),
            }]
        );
    }

    #[test]
    fn pointer_characters_in_keys_are_escaped() {
        let prev = json!({"a/b": 1});
        let next = json!({"a/b": 2});
        assert_eq!(
            diff(&prev, &next),
            vec![PatchOp::Replace {
                path: "/a~1b".into(),
                value: json!(2),
            }]
        );
        roundtrip(&prev, &next);
    }

    // Small deterministic value generator for the diff/apply property.
    struct Gen(u64);

    impl Gen {
        fn next(&mut self) -> u64 {
            // xorshift64
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn value(&mut self, depth: u32) -> Value {
            match self.next() % if depth == 0 { 4 } else { 6 } {
                0 => Value::Null,
                1 => json!(self.next() % 1000),
                2 => json!(format!("s{}", self.next() % 50)),
                3 => json!(self.next() % 2 == 0),
                4 => {
                    let len = (self.next() % 4) as usize;
                    Value::Array((0..len).map(|_| self.value(depth - 1)).collect())
                }
                _ => {
                    let len = (self.next() % 4) as usize;
                    let mut map = serde_json::Map::new();
                    for _ in 0..len {
                        map.insert(format!("k{}", self.next() % 6), self.value(depth - 1));
                    }
                    Value::Object(map)
                }
            }
        }
    }

    #[test]
    fn diff_apply_roundtrip_over_generated_snapshots() {
        let mut gen = Gen(0x9e3779b97f4a7c15);
        for _ in 0..200 {
            let prev = json!({"doc": gen.value(3)});
            let next = json!({"doc": gen.value(3)});
            roundtrip(&prev, &next);
        }
    }

    #[test]
    fn diff_of_identical_generated_snapshots_is_empty() {
        let mut gen = Gen(0x2545f4914f6cdd1d);
        for _ in 0..100 {
            let value = json!({"doc": gen.value(3)});
            assert!(diff(&value, &value).is_empty());
        }
    }
}
