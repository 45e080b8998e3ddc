use crate::constraint::Constraint;
use crate::error::ConfigError;
use crate::extract::{extract_paths, Placeholders, Update};
use crate::merge::{deep_merge, Merged};
use crate::path::{concat_paths, is_prefix, same_path, Key, StatePath};
use crate::route::{QueryParam, RouteDeclaration};
use crate::url::Solver;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

/// A route, resolved against all of its ancestors.
#[derive(Clone, Debug)]
pub struct CompiledRoute {
    path: Option<String>,
    full_path: String,
    constraints: Value,
    constraint: Constraint,
    query: IndexMap<String, QueryParam>,
    overrides: bool,
    dynamics: Vec<String>,
    updates: Vec<Update>,
    default_route: Option<String>,
    full_default_path: Option<String>,
    children: Vec<CompiledRoute>,
}

impl CompiledRoute {
    /// The path fragment as declared.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The absolute path of this route, such as `/project/:pid/settings`.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// The state constraints of this route merged with every ancestor's.
    pub fn constraints(&self) -> &Value {
        &self.constraints
    }

    /// The merged constraints, with placeholders tagged.
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// The query bindings of this route and its ancestors.
    pub fn query(&self) -> &IndexMap<String, QueryParam> {
        &self.query
    }

    /// Whether this route, or one of its descendants, contradicts a value
    /// constrained by an ancestor.
    pub fn overrides(&self) -> bool {
        self.overrides
    }

    /// The placeholders of the full path.
    pub fn dynamics(&self) -> &[String] {
        &self.dynamics
    }

    /// The state writes applied when this route is selected from a URL.
    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn default_route(&self) -> Option<&str> {
        self.default_route.as_deref()
    }

    /// The absolute path of the default route.
    pub fn full_default_path(&self) -> Option<&str> {
        self.full_default_path.as_deref()
    }

    pub fn children(&self) -> &[CompiledRoute] {
        &self.children
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a CompiledRoute>) {
        for child in &self.children {
            out.push(child);
            child.walk(out);
        }
    }
}

/// The compiled route tree, immutable once built.
#[derive(Clone, Debug)]
pub struct RouteTree {
    root: CompiledRoute,
    read_only: Vec<StatePath>,
    solver: Solver,
}

// What a route inherits from its parent.
struct Parent<'a> {
    constraints: &'a Value,
    query: &'a IndexMap<String, QueryParam>,
    full_path: &'a str,
}

impl RouteTree {
    /// Compiles a route declaration tree.
    ///
    /// ```
    /// use serde_json::json;
    /// use stateroute::{RouteDeclaration, RouteTree, Solver};
    ///
    /// let routes = RouteDeclaration::root("/home")
    ///     .with_route(RouteDeclaration::new("/home").with_state(json!({ "view": "home" })));
    /// let tree = RouteTree::compile(&routes, Solver::default())?;
    ///
    /// assert_eq!(tree.root().full_default_path(), Some("/home"));
    /// assert_eq!(tree.root().children()[0].full_path(), "/home");
    /// # Ok::<(), stateroute::ConfigError>(())
    /// ```
    pub fn compile(declaration: &RouteDeclaration, solver: Solver) -> Result<RouteTree, ConfigError> {
        let root = compile_route(declaration, &solver, None)?;

        Ok(RouteTree {
            root,
            read_only: declaration.read_only.clone(),
            solver,
        })
    }

    pub fn root(&self) -> &CompiledRoute {
        &self.root
    }

    /// The state paths the router must never write.
    pub fn read_only(&self) -> &[StatePath] {
        &self.read_only
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Returns true if the given state path is read-only.
    pub fn is_read_only(&self, path: &[Key]) -> bool {
        self.read_only.iter().any(|read_only| same_path(read_only, path))
    }

    /// Every route but the root, in pre-order.
    pub fn routes(&self) -> Vec<&CompiledRoute> {
        let mut routes = Vec::new();
        self.root.walk(&mut routes);
        routes
    }

    /// The state paths a router has to watch: the update paths of every
    /// route but the root, without duplicates. A path that is a prefix of
    /// another one is dropped, since watching the longer one is enough.
    pub fn watched_paths(&self) -> Vec<StatePath> {
        let mut paths: Vec<StatePath> = Vec::new();
        for route in self.routes() {
            for update in route.updates() {
                if !paths.contains(&update.path) {
                    paths.push(update.path.clone());
                }
            }
        }

        let all = paths.clone();
        paths.retain(|path| {
            !all.iter()
                .any(|other| other.len() > path.len() && is_prefix(path, other))
        });
        paths
    }
}

fn compile_route(
    declaration: &RouteDeclaration,
    solver: &Solver,
    parent: Option<&Parent<'_>>,
) -> Result<CompiledRoute, ConfigError> {
    let empty = Value::Object(Map::new());
    let base = parent.map_or(&empty, |parent| parent.constraints);
    let own = declaration.state.as_ref().unwrap_or(&empty);

    let Merged {
        value: constraints,
        mut conflict,
    } = deep_merge([base, own]);

    let mut query = parent.map(|parent| parent.query.clone()).unwrap_or_default();
    for (key, binding) in &declaration.query {
        if let Some(inherited) = query.get(key) {
            conflict |= inherited != binding;
        }
        query.insert(key.clone(), binding.clone());
    }

    let parent_path = parent.map_or("", |parent| parent.full_path);
    let full_path = concat_paths([parent_path, declaration.path.as_deref().unwrap_or("")]);

    let dynamics = solver.dynamics(&full_path);
    let placeholders = Placeholders {
        path: dynamics.clone(),
        query: query.values().map(|binding| binding.name.clone()).collect(),
    };
    let updates = extract_paths(&constraints, &placeholders);
    let constraint = Constraint::compile(&constraints, &placeholders);

    let full_default_path = declaration
        .default_route
        .as_deref()
        .map(|default| concat_paths([full_path.as_str(), default]));

    let children = {
        let context = Parent {
            constraints: &constraints,
            query: &query,
            full_path: &full_path,
        };

        declaration
            .routes
            .iter()
            .map(|child| compile_route(child, solver, Some(&context)))
            .collect::<Result<Vec<_>, _>>()?
    };

    if conflict {
        debug!(route = %full_path, "route overrides the constraints of its ancestors");
    }
    let overrides = conflict || children.iter().any(CompiledRoute::overrides);

    let is_root = parent.is_none();
    if is_root && declaration.default_route.is_none() {
        return Err(ConfigError::MissingRootDefault);
    }

    if let Some(default) = &declaration.default_route {
        // a child without a path cannot be redirected to
        let registered = declaration
            .routes
            .iter()
            .filter_map(|child| child.path.as_deref())
            .any(|path| solver.matches(path, default));

        if !registered {
            return Err(ConfigError::UnmatchedDefault {
                route: full_path,
                default: default.clone(),
            });
        }
    }

    if declaration.path.is_none() && declaration.default_route.is_none() {
        return Err(ConfigError::MissingPathOrDefault { route: full_path });
    }

    if !is_root && updates.is_empty() {
        return Err(ConfigError::MissingUpdates { route: full_path });
    }

    Ok(CompiledRoute {
        path: declaration.path.clone(),
        full_path,
        constraints,
        constraint,
        query,
        overrides,
        dynamics,
        updates,
        default_route: declaration.default_route.clone(),
        full_default_path,
        children,
    })
}
