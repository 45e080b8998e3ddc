use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// The values captured when a state snapshot matches a route, keyed by
/// placeholder name.
///
/// ```rust
/// use serde_json::json;
/// use stateroute::Constraint;
/// use stateroute::extract::Placeholders;
///
/// let constraint = Constraint::compile(&json!({ "a": { "b": ":d" } }), &Placeholders::path([":d"]));
/// let captures = constraint.captures(&json!({ "a": { "b": "abc" } })).unwrap();
///
/// assert_eq!(captures.get(":d"), Some(&json!("abc")));
/// for (name, value) in captures.iter() {
///     println!("{} = {}", name, value);
/// }
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct Captures {
    values: IndexMap<String, Value>,
}

impl Captures {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the number of captured values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value captured for the given placeholder.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&Value> {
        self.values.get(name.as_ref())
    }

    /// Returns the text captured for the given placeholder, if it is a
    /// non-null value.
    pub fn text(&self, name: impl AsRef<str>) -> Option<String> {
        self.get(name)
            .and_then(crate::escape::value_text)
            .map(|text| text.into_owned())
    }

    /// Returns an iterator over the captured names and values.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    // Records a captured value. Later captures override earlier ones.
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    // Merges the captures of a sub-match into this one.
    pub(crate) fn extend(&mut self, other: Captures) {
        self.values.extend(other.values);
    }
}

impl fmt::Debug for Captures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> FromIterator<(&'a str, Value)> for Captures {
    fn from_iter<T: IntoIterator<Item = (&'a str, Value)>>(iter: T) -> Self {
        let mut captures = Captures::new();
        for (name, value) in iter {
            captures.insert(name, value);
        }
        captures
    }
}
