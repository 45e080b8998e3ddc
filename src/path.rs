use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step in a [`StatePath`]: a mapping field or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(usize),
    Field(String),
}

/// The location of a value inside the state tree, from the root.
pub type StatePath = Vec<Key>;

impl From<&str> for Key {
    fn from(field: &str) -> Self {
        Key::Field(field.to_owned())
    }
}

impl From<String> for Key {
    fn from(field: String) -> Self {
        Key::Field(field)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Field(s) => f.write_str(s),
        }
    }
}

/// Builds a [`StatePath`] out of anything convertible into keys.
///
/// ```
/// use stateroute::{state_path, Key};
///
/// let path = state_path(["data", "pid"]);
/// assert_eq!(path, vec![Key::from("data"), Key::from("pid")]);
/// ```
pub fn state_path<I, K>(keys: I) -> StatePath
where
    I: IntoIterator<Item = K>,
    K: Into<Key>,
{
    keys.into_iter().map(Into::into).collect()
}

/// Renders a state path as `a.b.0.c`, for logs and error messages.
pub(crate) fn display_path(path: &[Key]) -> String {
    path.iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

// Concatenates route fragments into an absolute, normalized path.
//
// The result always starts with a single '/', never contains empty
// segments produced by doubled slashes and never ends with '/', except for
// the root itself which is "/".
pub fn concat_paths<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::from("/");

    for segment in parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
    {
        if out.len() > 1 {
            out.push('/');
        }
        out.push_str(segment);
    }

    out
}

/// Strips the query string (everything from the first `?`) off a URL.
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(i) => &url[..i],
        None => url,
    }
}

/// Returns the query string of a URL, without the leading `?`.
pub fn query_string(url: &str) -> &str {
    match url.find('?') {
        Some(i) => &url[i + 1..],
        None => "",
    }
}

// Splits a route pattern or a concrete URL into its segments.
//
// One leading slash and the query string are ignored, so that the root
// "/" has no segments and is a prefix of every URL. Empty segments in the
// middle or at the end are kept: "/a//c" is ["a", "", "c"].
pub fn segments(url: &str) -> Vec<&str> {
    let path = strip_query(url);
    let path = path.strip_prefix('/').unwrap_or(path);

    if path.is_empty() {
        return Vec::new();
    }

    path.split('/').collect()
}

/// Returns true if both paths have the same length and equal keys in the
/// same order.
pub fn same_path(a: &[Key], b: &[Key]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Returns true if `prefix` is a (non-strict) prefix of `path`.
pub(crate) fn is_prefix(prefix: &[Key], path: &[Key]) -> bool {
    prefix.len() <= path.len() && same_path(prefix, &path[..prefix.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    // parts, result
    fn concat_tests() -> Vec<(Vec<&'static str>, &'static str)> {
        vec![
            // one argument
            (vec!["a"], "/a"),
            (vec!["/a"], "/a"),
            // two arguments
            (vec!["a", ""], "/a"),
            (vec!["", "b"], "/b"),
            (vec!["a", "b"], "/a/b"),
            (vec!["a", "/b"], "/a/b"),
            (vec!["a/", "/b"], "/a/b"),
            (vec!["a/", "b"], "/a/b"),
            (vec!["/a", "/b"], "/a/b"),
            // root
            (vec![], "/"),
            (vec![""], "/"),
            (vec!["", ""], "/"),
            (vec!["/", "/"], "/"),
            // doubled and trailing slashes
            (vec!["//a//", "b//"], "/a/b"),
            (vec!["/project/:pid", "/settings"], "/project/:pid/settings"),
        ]
    }

    #[test]
    fn concat() {
        for (parts, expected) in concat_tests() {
            let got = concat_paths(parts.iter().copied());
            assert_eq!(got, expected, "{:?}", parts);

            // already normalized paths are left untouched
            assert_eq!(concat_paths([expected]), expected);
        }
    }

    #[test]
    fn split_segments() {
        assert!(segments("").is_empty());
        assert!(segments("/").is_empty());
        assert!(segments("/?a=b").is_empty());
        assert_eq!(segments("/a/b"), ["a", "b"]);
        assert_eq!(segments("a/b"), ["a", "b"]);
        assert_eq!(segments("/a/"), ["a", ""]);
        assert_eq!(segments("/a//c"), ["a", "", "c"]);
        assert_eq!(segments("/a/b?c=/d"), ["a", "b"]);
    }

    #[test]
    fn query() {
        assert_eq!(strip_query("/a?b=c"), "/a");
        assert_eq!(query_string("/a?b=c&d"), "b=c&d");
        assert_eq!(query_string("/a"), "");
    }

    #[test]
    fn compare_paths() {
        let a = state_path(["abc", "def"]);
        assert!(same_path(&a, &a.clone()));
        assert!(!same_path(&a, &state_path(["abc"])));
        assert!(!same_path(&state_path(["abc"]), &a));
        assert!(!same_path(&[Key::Index(0)], &[Key::from("0")]));

        assert!(is_prefix(&state_path(["abc"]), &a));
        assert!(is_prefix(&a, &a));
        assert!(!is_prefix(&a, &state_path(["abc"])));
    }

    #[test]
    fn deserialize_keys() {
        let path: StatePath = serde_json::from_str(r#"["list", 2, "name"]"#).unwrap();
        assert_eq!(path, vec![Key::from("list"), Key::Index(2), Key::from("name")]);
        assert_eq!(display_path(&path), "list.2.name");
    }
}
