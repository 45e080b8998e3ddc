use crate::error::ConfigError;
use crate::escape::{escape, unescape, value_text};
use crate::params::Captures;
use crate::path::{query_string, segments};
use crate::route::QueryParam;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

/// The default placeholder syntax: `:name`.
pub const DEFAULT_PATTERN: &str = ":([^/:]*)";

/// Recognizes placeholder segments in route paths.
///
/// A segment is a placeholder when the pattern matches it entirely. The
/// default pattern recognizes `:name`; any other syntax can be configured:
///
/// ```
/// use stateroute::Solver;
///
/// let solver = Solver::new(r"\{([^/\}]*)\}")?;
/// assert!(solver.matches("/a/{b}", "/a/b/c"));
/// assert!(!solver.matches("/a/:b", "/a/b/c"));
/// # Ok::<(), stateroute::ConfigError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Solver {
    pattern: String,
    anchored: Regex,
}

impl Solver {
    /// Compiles a placeholder pattern.
    pub fn new(pattern: &str) -> Result<Solver, ConfigError> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|err| ConfigError::InvalidPattern(err.to_string()))?;

        Ok(Solver {
            pattern: pattern.to_owned(),
            anchored,
        })
    }

    /// The pattern this solver was built from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the whole segment is a placeholder.
    pub fn is_placeholder(&self, segment: &str) -> bool {
        self.anchored.is_match(segment)
    }

    /// Returns the placeholders of a route path, in order, without duplicates.
    pub fn dynamics(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in segments(path) {
            if self.is_placeholder(segment) && !names.iter().any(|name| name == segment) {
                names.push(segment.to_owned());
            }
        }
        names
    }

    /// Tests whether a concrete URL satisfies a route pattern.
    ///
    /// The route may be a prefix of a longer URL. A placeholder segment
    /// requires a non-empty concrete segment; any other segment must be
    /// equal. The query string of the URL is ignored.
    pub fn matches(&self, route: &str, url: &str) -> bool {
        let route = segments(route);
        let url = segments(url);

        if route.len() > url.len() {
            return false;
        }

        route.iter().zip(&url).all(|(expected, actual)| {
            if self.is_placeholder(expected) {
                !actual.is_empty()
            } else {
                expected == actual
            }
        })
    }

    /// Copies the concrete segments of `url` into the placeholder positions
    /// of `template`. Placeholders with no concrete counterpart are kept.
    ///
    /// ```
    /// use stateroute::Solver;
    ///
    /// let solver = Solver::default();
    /// let url = solver.overlay("/project/:pid/dashboard", "/project/123/unknown");
    /// assert_eq!(url, "/project/123/dashboard");
    /// ```
    pub fn overlay(&self, template: &str, url: &str) -> String {
        let concrete = segments(url);
        let overlaid: Vec<&str> = segments(template)
            .into_iter()
            .enumerate()
            .map(|(i, segment)| match concrete.get(i) {
                Some(actual) if self.is_placeholder(segment) && !actual.is_empty() => *actual,
                _ => segment,
            })
            .collect();

        format!("/{}", overlaid.join("/"))
    }

    /// Reads the value of a path placeholder out of a concrete URL, given the
    /// route path that declared it. Values are percent-decoded.
    pub(crate) fn segment_value(&self, route: &str, url: &str, name: &str) -> Option<String> {
        let position = segments(route).iter().position(|segment| *segment == name)?;
        segments(url)
            .get(position)
            .filter(|segment| !segment.is_empty())
            .map(|segment| unescape(segment).into_owned())
    }
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new(DEFAULT_PATTERN).expect("the default placeholder pattern is valid")
    }
}

/// Substitutes captured values into a route path and appends the query.
///
/// Segments equal to a captured placeholder name are replaced by the escaped
/// value; placeholders without a value are left as is. Every query entry
/// with a non-null value is appended as `?key=value&...`.
///
/// ```
/// use indexmap::IndexMap;
/// use serde_json::{json, Value};
/// use stateroute::Captures;
/// use stateroute::url::resolve_url;
///
/// let captures: Captures = [(":c", json!("C")), (":d", json!("D"))].into_iter().collect();
/// let query = IndexMap::from([("e".to_owned(), json!("E")), ("f".to_owned(), Value::Null)]);
///
/// assert_eq!(resolve_url("a/:b/:c", &captures, &query), "a/:b/C?e=E");
/// ```
pub fn resolve_url(template: &str, captures: &Captures, query: &IndexMap<String, Value>) -> String {
    let path = template
        .split('/')
        .map(|segment| match captures.get(segment).and_then(value_text) {
            Some(text) => escape(&text).into_owned(),
            None => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/");

    let query = query
        .iter()
        .filter_map(|(key, value)| {
            value_text(value).map(|text| format!("{}={}", escape(key), escape(&text)))
        })
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    }
}

/// Parses the query string of a URL into placeholder values, following the
/// declared bindings. Unknown keys are ignored.
pub fn parse_query(url: &str, bindings: &IndexMap<String, QueryParam>) -> Captures {
    let mut values = Captures::new();

    for pair in query_string(url).split('&').filter(|pair| !pair.is_empty()) {
        let (key, raw) = match pair.split_once('=') {
            Some((key, raw)) => (key, Some(raw)),
            None => (pair, None),
        };

        let key = unescape(key);
        if let Some(binding) = bindings.get(&*key) {
            let raw = raw.map(unescape);
            values.insert(binding.name.clone(), binding.cast.apply(raw.as_deref()));
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_placeholders() {
        let solver = Solver::default();
        assert!(solver.is_placeholder(":pid"));
        assert!(!solver.is_placeholder("a:pid"));
        assert!(!solver.is_placeholder("pid"));
        assert_eq!(solver.dynamics("/a/:b/c/:d/:b"), [":b", ":d"]);
    }

    #[test]
    fn invalid_pattern() {
        assert!(matches!(
            Solver::new("(unclosed"),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn overlay_keeps_unresolved() {
        let solver = Solver::default();
        assert_eq!(solver.overlay("/home", "/something/else"), "/home");
        assert_eq!(solver.overlay("/p/:pid/d", "/p"), "/p/:pid/d");
        assert_eq!(solver.overlay("/p/:pid/d", "/p/?x=1"), "/p/:pid/d");
        assert_eq!(solver.overlay("/p/:pid/d", "/p/1?x=1"), "/p/1/d");
    }

    #[test]
    fn segment_values() {
        let solver = Solver::default();
        let value = solver.segment_value("/p/:pid", "/p/a%20b/c?x=y", ":pid");
        assert_eq!(value.as_deref(), Some("a b"));
        assert_eq!(solver.segment_value("/p/:pid", "/p", ":pid"), None);
        assert_eq!(solver.segment_value("/p", "/p/1", ":pid"), None);
    }
}
