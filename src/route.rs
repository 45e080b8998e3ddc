use crate::error::ConfigError;
use crate::path::{Key, StatePath};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Number, Value};

/// A route, as declared by the user.
///
/// Declarations form a tree: each route may declare a path fragment, some
/// state constraints, query bindings and child routes. They are usually
/// written as JSON:
///
/// ```
/// use stateroute::RouteDeclaration;
///
/// let routes = RouteDeclaration::from_json(r#"{
///     "defaultRoute": "/home",
///     "routes": [
///         { "path": "/home", "state": { "view": "home" } },
///         { "path": "/project/:pid", "state": { "view": "project", "pid": ":pid" } }
///     ]
/// }"#)?;
///
/// assert_eq!(routes.routes.len(), 2);
/// # Ok::<(), stateroute::ConfigError>(())
/// ```
///
/// or built programmatically:
///
/// ```
/// use serde_json::json;
/// use stateroute::RouteDeclaration;
///
/// let routes = RouteDeclaration::root("/home")
///     .with_route(RouteDeclaration::new("/home").with_state(json!({ "view": "home" })))
///     .with_route(
///         RouteDeclaration::new("/project/:pid")
///             .with_state(json!({ "view": "project", "pid": ":pid" }))
///             .with_query("tab", ":tab"),
///     );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDeclaration {
    /// The URL fragment of this route, relative to its parent.
    #[serde(default)]
    pub path: Option<String>,
    /// The state constraints of this route, merged with its ancestors' ones.
    #[serde(default)]
    pub state: Option<Value>,
    /// Query keys bound to state placeholders.
    #[serde(default)]
    pub query: IndexMap<String, QueryParam>,
    /// The child path to redirect to when this route matches.
    #[serde(default)]
    pub default_route: Option<String>,
    /// State paths the router may read but must never write. Only read on
    /// the root route.
    #[serde(default)]
    pub read_only: Vec<StatePath>,
    /// Child routes, in priority order.
    #[serde(default)]
    pub routes: Vec<RouteDeclaration>,
}

impl RouteDeclaration {
    /// Creates a route with the given path fragment.
    pub fn new(path: impl Into<String>) -> Self {
        RouteDeclaration {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Creates a root route redirecting to the given default route.
    pub fn root(default_route: impl Into<String>) -> Self {
        RouteDeclaration {
            default_route: Some(default_route.into()),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Binds the query key `key` to the placeholder `name`, as a string.
    pub fn with_query(self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.with_query_cast(key, name, Cast::String)
    }

    pub fn with_query_cast(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        cast: Cast,
    ) -> Self {
        self.query.insert(
            key.into(),
            QueryParam {
                name: name.into(),
                cast,
            },
        );
        self
    }

    pub fn with_default_route(mut self, default_route: impl Into<String>) -> Self {
        self.default_route = Some(default_route.into());
        self
    }

    /// Marks a state path as read-only.
    pub fn with_read_only<I, K>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.read_only.push(path.into_iter().map(Into::into).collect());
        self
    }

    /// Appends a child route.
    pub fn with_route(mut self, route: RouteDeclaration) -> Self {
        self.routes.push(route);
        self
    }

    /// Parses a route tree from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads a route tree out of an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

/// A query key binding: the placeholder it feeds and how to cast it.
///
/// Declared either as a bare placeholder name (`"tab": ":tab"`) or as
/// `{ "match": ":tab", "cast": "number" }`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "RawQueryParam")]
pub struct QueryParam {
    pub name: String,
    pub cast: Cast,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQueryParam {
    Name(String),
    Full {
        #[serde(rename = "match")]
        name: String,
        #[serde(default)]
        cast: Cast,
    },
}

impl From<RawQueryParam> for QueryParam {
    fn from(raw: RawQueryParam) -> Self {
        match raw {
            RawQueryParam::Name(name) => QueryParam {
                name,
                cast: Cast::String,
            },
            RawQueryParam::Full { name, cast } => QueryParam { name, cast },
        }
    }
}

/// How a raw query value is converted before being written to the state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cast {
    #[default]
    String,
    Number,
    Boolean,
}

impl Cast {
    /// Converts a decoded query value. `None` means the key had no `=value`
    /// part.
    pub fn apply(self, raw: Option<&str>) -> Value {
        match self {
            Cast::String => raw.map_or(Value::Null, |raw| Value::String(raw.to_owned())),
            Cast::Number => raw.map_or(Value::Null, parse_number),
            Cast::Boolean => Value::Bool(raw == Some("true")),
        }
    }
}

// Numeric conversion with the leniency of JavaScript's unary `+`: blank
// text is zero, anything unparsable is null.
fn parse_number(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::from(0);
    }

    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }

    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}
