use crate::path::{Key, StatePath};

use serde_json::Value;

/// Where the value of a placeholder comes from in the URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// A dynamic path segment, such as `:pid` in `/project/:pid`.
    Path,
    /// A query parameter.
    Query,
}

/// The placeholder names known to a route.
///
/// Path placeholders take precedence: a name that is both a path segment and
/// a query binding is treated as a path placeholder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placeholders {
    pub path: Vec<String>,
    pub query: Vec<String>,
}

impl Placeholders {
    /// Creates a set of placeholders from path names only.
    pub fn path<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Placeholders {
            path: names.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    /// Returns the source of the placeholder named `text`, if any.
    pub fn classify(&self, text: &str) -> Option<Source> {
        if self.path.iter().any(|name| name == text) {
            Some(Source::Path)
        } else if self.query.iter().any(|name| name == text) {
            Some(Source::Query)
        } else {
            None
        }
    }
}

/// The value a route writes at some state path.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    /// A literal value, written as is.
    Literal(Value),
    /// A value read from the URL.
    Placeholder { name: String, source: Source },
}

impl Binding {
    /// Tags a constraint leaf: strings naming a known placeholder become
    /// placeholders, anything else is a literal.
    pub fn classify(leaf: &Value, placeholders: &Placeholders) -> Binding {
        if let Value::String(text) = leaf {
            if let Some(source) = placeholders.classify(text) {
                return Binding::Placeholder {
                    name: text.clone(),
                    source,
                };
            }
        }

        Binding::Literal(leaf.clone())
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Binding::Placeholder { .. })
    }
}

/// A single state write derived from a constraint tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub path: StatePath,
    pub binding: Binding,
}

/// Flattens a tree into the list of its leaves.
///
/// Non-empty mappings and sequences are traversed, everything else (scalars,
/// `null`, empty containers) is a leaf. Leaves are listed in the enumeration
/// order of the tree, with their absolute path.
///
/// ```
/// use serde_json::json;
/// use stateroute::extract::{extract_paths, Binding, Placeholders};
///
/// let updates = extract_paths(
///     &json!({ "a": ":d1", "b": { "c": "def" } }),
///     &Placeholders::path([":d1"]),
/// );
///
/// assert_eq!(updates.len(), 2);
/// assert!(updates[0].binding.is_dynamic());
/// assert_eq!(updates[1].binding, Binding::Literal(json!("def")));
/// ```
pub fn extract_paths(tree: &Value, placeholders: &Placeholders) -> Vec<Update> {
    let mut updates = Vec::new();
    let mut path = Vec::new();
    walk(tree, placeholders, &mut path, &mut updates);
    updates
}

fn walk(node: &Value, placeholders: &Placeholders, path: &mut StatePath, out: &mut Vec<Update>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(Key::Field(key.clone()));
                visit(child, placeholders, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                path.push(Key::Index(i));
                visit(child, placeholders, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

fn visit(node: &Value, placeholders: &Placeholders, path: &mut StatePath, out: &mut Vec<Update>) {
    if is_branch(node) {
        walk(node, placeholders, path, out);
    } else {
        out.push(Update {
            path: path.clone(),
            binding: Binding::classify(node, placeholders),
        });
    }
}

fn is_branch(node: &Value) -> bool {
    match node {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}
