use crate::extract::{Binding, Placeholders, Source};
use crate::merge::same_value;
use crate::params::Captures;

use indexmap::IndexMap;
use serde_json::Value;

/// The state constraints of a route, with placeholders resolved.
///
/// A constraint mirrors the shape of the state it applies to. Leaves are
/// either literal values the state must hold, or placeholders whose value is
/// captured from the state.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    /// A scalar (or `null`) the state must be equal to.
    Literal(Value),
    /// A value captured from the state.
    Placeholder { name: String, source: Source },
    /// A sequence of the same length, matched element-wise.
    List(Vec<Constraint>),
    /// A mapping whose every key must match. Extra state keys are ignored.
    Map(IndexMap<String, Constraint>),
}

impl Constraint {
    /// Tags a raw constraint tree with the given placeholders.
    pub fn compile(tree: &Value, placeholders: &Placeholders) -> Constraint {
        match tree {
            Value::Object(map) => Constraint::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Constraint::compile(value, placeholders)))
                    .collect(),
            ),
            Value::Array(items) => Constraint::List(
                items
                    .iter()
                    .map(|value| Constraint::compile(value, placeholders))
                    .collect(),
            ),
            leaf => match Binding::classify(leaf, placeholders) {
                Binding::Literal(value) => Constraint::Literal(value),
                Binding::Placeholder { name, source } => Constraint::Placeholder { name, source },
            },
        }
    }

    /// Matches a state snapshot against this constraint.
    ///
    /// Returns the captured placeholder values, or `None` as soon as any part
    /// of the state does not satisfy the constraint. A path placeholder only
    /// captures truthy values: a missing dynamic value is a mismatch. A query
    /// placeholder captures anything, including `null` and absent values.
    pub fn captures(&self, state: &Value) -> Option<Captures> {
        self.match_node(Some(state))
    }

    fn match_node(&self, state: Option<&Value>) -> Option<Captures> {
        match self {
            Constraint::List(items) => {
                let state = match state {
                    Some(Value::Array(state)) if state.len() == items.len() => state,
                    _ => return None,
                };

                let mut captures = Captures::new();
                for (item, value) in items.iter().zip(state) {
                    captures.extend(item.match_node(Some(value))?);
                }
                Some(captures)
            }
            Constraint::Map(entries) => {
                let state = match state {
                    Some(Value::Object(state)) => state,
                    _ => return None,
                };

                let mut captures = Captures::new();
                for (key, entry) in entries {
                    captures.extend(entry.match_node(state.get(key))?);
                }
                Some(captures)
            }
            Constraint::Placeholder {
                name,
                source: Source::Path,
            } => {
                let value = state.filter(|value| is_truthy(value))?;
                let mut captures = Captures::new();
                captures.insert(name.clone(), value.clone());
                Some(captures)
            }
            Constraint::Placeholder {
                name,
                source: Source::Query,
            } => {
                let mut captures = Captures::new();
                captures.insert(name.clone(), state.cloned().unwrap_or(Value::Null));
                Some(captures)
            }
            Constraint::Literal(expected) => {
                let matches = match state {
                    None => expected.is_null(),
                    Some(value) => same_value(expected, value),
                };
                matches.then(Captures::new)
            }
        }
    }

    /// Returns true if every leaf of `required` is held by this constraint as
    /// an equal literal (a `null` leaf is also held by an absent one).
    ///
    /// This is the inverse of [`Constraint::captures`]: the state decides and
    /// the route is checked against it. Placeholders never hold a required
    /// value.
    pub fn admits(&self, required: &Value) -> bool {
        admits(Some(self), required)
    }
}

fn admits(constraint: Option<&Constraint>, required: &Value) -> bool {
    match required {
        Value::Object(map) => match constraint {
            Some(Constraint::Map(entries)) => map
                .iter()
                .all(|(key, value)| admits(entries.get(key), value)),
            _ => false,
        },
        Value::Array(items) => match constraint {
            Some(Constraint::List(entries)) if entries.len() == items.len() => entries
                .iter()
                .zip(items)
                .all(|(entry, value)| admits(Some(entry), value)),
            _ => false,
        },
        scalar => match constraint {
            None => scalar.is_null(),
            Some(Constraint::Literal(expected)) => same_value(expected, scalar),
            Some(_) => false,
        },
    }
}

// JavaScript-like truthiness, used to reject empty dynamic values.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness() {
        assert!(is_truthy(&json!("a")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn compile_tags_leaves() {
        let placeholders = Placeholders {
            path: vec![":pid".into()],
            query: vec![":pid".into(), ":q".into()],
        };
        let constraint = Constraint::compile(
            &json!({ "a": ":pid", "b": [":q", ":other"] }),
            &placeholders,
        );

        let expected = Constraint::Map(IndexMap::from([
            (
                "a".to_owned(),
                Constraint::Placeholder {
                    name: ":pid".into(),
                    source: Source::Path,
                },
            ),
            (
                "b".to_owned(),
                Constraint::List(vec![
                    Constraint::Placeholder {
                        name: ":q".into(),
                        source: Source::Query,
                    },
                    Constraint::Literal(json!(":other")),
                ]),
            ),
        ]));
        assert_eq!(constraint, expected);
    }

    #[test]
    fn admits_required_values() {
        let constraint = Constraint::compile(
            &json!({ "logged": true, "data": { "pid": ":pid" } }),
            &Placeholders::path([":pid"]),
        );

        assert!(constraint.admits(&json!({})));
        assert!(constraint.admits(&json!({ "logged": true })));
        assert!(constraint.admits(&json!({ "missing": null })));
        assert!(!constraint.admits(&json!({ "logged": false })));
        assert!(!constraint.admits(&json!({ "missing": 1 })));
        assert!(!constraint.admits(&json!({ "data": { "pid": "123" } })));
    }
}
