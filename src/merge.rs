use serde_json::{Map, Value};
use std::mem;

/// The result of a [`deep_merge`].
#[derive(Clone, Debug, PartialEq)]
pub struct Merged {
    /// The merged tree. `Null` when nothing was merged.
    pub value: Value,
    /// Whether some leaf received two different values.
    pub conflict: bool,
}

/// Merges a sequence of trees into a fresh one.
///
/// Each tree overrides the previous ones at every overlapping leaf. Mappings
/// are merged key by key and sequences index by index. The returned flag is
/// set when some shared leaf held two different values, when two sequences
/// with different lengths were merged at the same place, or when a non-null
/// value was replaced by a value of another shape.
///
/// An absent key is never in conflict with anything, and neither is `null`
/// replaced by a mapping or a sequence.
///
/// ```
/// use serde_json::json;
/// use stateroute::merge::deep_merge;
///
/// let merged = deep_merge([&json!({ "a": 1, "c": { "d": 1 } }), &json!({ "b": 1, "c": { "d": 2 } })]);
/// assert_eq!(merged.value, json!({ "a": 1, "b": 1, "c": { "d": 2 } }));
/// assert!(merged.conflict);
/// ```
pub fn deep_merge<'a, I>(trees: I) -> Merged
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut slot = None;
    let mut conflict = false;

    for tree in trees {
        conflict |= merge_into(&mut slot, tree);
    }

    Merged {
        value: slot.unwrap_or(Value::Null),
        conflict,
    }
}

// Merges `incoming` into `slot` (`None` meaning absent), returning whether a
// conflict was found anywhere below.
fn merge_into(slot: &mut Option<Value>, incoming: &Value) -> bool {
    match incoming {
        Value::Object(map) => {
            let mut conflict = false;
            if !matches!(slot, Some(Value::Object(_))) {
                conflict = replaces_value(slot);
                *slot = Some(Value::Object(Map::new()));
            }

            if let Some(Value::Object(target)) = slot {
                for (key, value) in map {
                    match target.get_mut(key) {
                        Some(existing) => {
                            let mut child = Some(mem::take(existing));
                            conflict |= merge_into(&mut child, value);
                            *existing = child.unwrap_or(Value::Null);
                        }
                        None => {
                            let mut child = None;
                            conflict |= merge_into(&mut child, value);
                            target.insert(key.clone(), child.unwrap_or(Value::Null));
                        }
                    }
                }
            }

            conflict
        }
        Value::Array(items) => {
            let mut conflict = false;
            match slot {
                Some(Value::Array(existing)) => conflict = existing.len() != items.len(),
                _ => {
                    conflict = replaces_value(slot);
                    *slot = Some(Value::Array(Vec::with_capacity(items.len())));
                }
            }

            if let Some(Value::Array(target)) = slot {
                for (i, value) in items.iter().enumerate() {
                    match target.get_mut(i) {
                        Some(existing) => {
                            let mut child = Some(mem::take(existing));
                            conflict |= merge_into(&mut child, value);
                            *existing = child.unwrap_or(Value::Null);
                        }
                        None => {
                            let mut child = None;
                            conflict |= merge_into(&mut child, value);
                            target.push(child.unwrap_or(Value::Null));
                        }
                    }
                }
            }

            conflict
        }
        scalar => {
            let conflict = match slot {
                Some(existing) => !same_value(existing, scalar),
                None => false,
            };
            *slot = Some(scalar.clone());
            conflict
        }
    }
}

// A container replacing something that is neither absent nor null.
fn replaces_value(slot: &Option<Value>) -> bool {
    matches!(slot, Some(value) if !value.is_null())
}

/// Strict equality between two state values.
///
/// Numbers are compared by value, so `1` and `1.0` are equal. Containers
/// are compared structurally.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| same_value(v, other)))
        }
        _ => a == b,
    }
}
