//! `Router` keeps a state store and a URL in sync, following a route tree.
//!
//! Each route declares a URL fragment and the state values it implies.
//! When the URL changes, the router picks the deepest route matching it and
//! writes that route's values to the store. When the store changes, the
//! router picks the route whose constraints the state satisfies and shows
//! its URL.
//!
//! ```rust
//! use serde_json::json;
//! use std::rc::Rc;
//! use stateroute::{
//!     state_path, MemoryStore, MemoryTransport, RouteDeclaration, Router, Settings, StateStore,
//! };
//!
//! let routes = RouteDeclaration::from_json(r#"{
//!     "defaultRoute": "/home",
//!     "routes": [
//!         { "path": "/home", "state": { "view": "home", "pid": null } },
//!         { "path": "/project/:pid", "state": { "view": "project", "pid": ":pid" } }
//!     ]
//! }"#)?;
//!
//! let store = Rc::new(MemoryStore::new(json!({ "view": null, "pid": null })));
//! let location = MemoryTransport::new();
//! let router = Router::new(
//!     Rc::clone(&store),
//!     &routes,
//!     Settings::new().with_transport(location.clone()),
//! )?;
//!
//! // the initial URL redirects to the default route
//! assert_eq!(location.url(), "/home");
//! assert_eq!(store.snapshot(), json!({ "view": "home", "pid": null }));
//!
//! // state to URL
//! store.set(&state_path(["view"]), json!("project"));
//! store.set(&state_path(["pid"]), json!("42"));
//! store.commit();
//! assert_eq!(location.url(), "/project/42");
//!
//! // URL to state
//! location.navigate("/project/7");
//! assert_eq!(store.get(&state_path(["pid"])), Some(json!("7")));
//!
//! router.kill();
//! # Ok::<(), stateroute::ConfigError>(())
//! ```
//!
//! Route selection goes children first: the first child (in declaration
//! order) that matches wins, and a route only handles a URL or a state
//! itself when none of its children does. A route with a default route
//! redirects to it instead of being selected.
//!
//! When a state matches no route at all, the router falls back to the first
//! child of the root that agrees with the read-only part of the state, then
//! to the root's default route. A URL or a state matching nothing is never
//! an error.
use crate::constraint::Constraint;
use crate::error::ConfigError;
use crate::extract::Binding;
use crate::merge::same_value;
use crate::params::Captures;
use crate::path::display_path;
use crate::route::RouteDeclaration;
use crate::store::{assign, lookup, StateStore, Subscription};
use crate::transport::{MemoryTransport, UrlTransport};
use crate::tree::{CompiledRoute, RouteTree};
use crate::url::{parse_query, resolve_url, Solver};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// The maximum number of passes run for a single external change.
///
/// Route trees whose constraints contradict each other can make the two
/// directions bounce forever. Passes beyond this limit are dropped.
pub const MAX_PASSES: usize = 64;

/// Router options.
///
/// ```rust
/// use stateroute::{MemoryTransport, Settings, Solver};
///
/// let settings = Settings::new()
///     .with_solver(Solver::new(r"\{([^/\}]*)\}")?)
///     .with_transport(MemoryTransport::with_base_path("/app"));
/// # Ok::<(), stateroute::ConfigError>(())
/// ```
#[derive(Default)]
pub struct Settings {
    solver: Option<Solver>,
    transport: Option<Box<dyn UrlTransport>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the placeholder syntax. Defaults to `:name`.
    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Sets where the URL is read and shown. Defaults to a fresh
    /// [`MemoryTransport`].
    pub fn with_transport(mut self, transport: impl UrlTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("solver", &self.solver)
            .field("transport", &self.transport.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Binds a state store to a URL transport.
///
/// The router lives as long as the returned value: dropping it, or calling
/// [`kill`](Router::kill), stops it and releases the store.
pub struct Router<S: StateStore + 'static> {
    inner: Rc<Inner<S>>,
}

impl<S: StateStore + 'static> Router<S> {
    /// Compiles the route tree and binds the router to `store`.
    ///
    /// The URL currently shown by the transport is reconciled right away.
    /// Fails if the route declarations are invalid or if another router is
    /// bound to the store.
    pub fn new(
        store: Rc<S>,
        routes: &RouteDeclaration,
        settings: Settings,
    ) -> Result<Router<S>, ConfigError> {
        let Settings { solver, transport } = settings;
        let tree = RouteTree::compile(routes, solver.unwrap_or_default())?;

        if !store.bind_router() {
            return Err(ConfigError::StoreAlreadyBound);
        }

        let transport = transport.unwrap_or_else(|| Box::new(MemoryTransport::new()));
        let inner = Rc::new(Inner {
            store,
            tree,
            transport: RefCell::new(transport),
            subscription: RefCell::new(None),
            stored: RefCell::new(None),
            queue: RefCell::new(VecDeque::new()),
            busy: Cell::new(false),
            killed: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = inner.store.watch(
            inner.tree.watched_paths(),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.schedule(Pass::State);
                }
            }),
        );
        *inner.subscription.borrow_mut() = Some(subscription);

        // a transport may report a URL from `init`: only queue it while the
        // transport is borrowed
        let weak = Rc::downgrade(&inner);
        inner.busy.set(true);
        inner.transport.borrow_mut().init(Box::new(move |url: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.url_changed(url);
            }
        }));
        inner.busy.set(false);

        let current = inner.transport.borrow().current_url();
        debug!(url = %current, "router bound");
        inner.url_changed(&current);
        inner.drain();

        Ok(Router { inner })
    }

    /// Reconciles the state with the given URL, as if the transport had
    /// reported it.
    pub fn reconcile_from_url(&self, url: &str) {
        self.inner.reconcile_url(url.to_owned());
    }

    /// Reconciles the URL with the current state, as if the store had
    /// reported a change.
    pub fn reconcile_from_state(&self) {
        self.inner.schedule(Pass::State);
    }

    /// The compiled route tree.
    pub fn routes(&self) -> &RouteTree {
        &self.inner.tree
    }

    /// The last URL the router observed or showed.
    pub fn current_url(&self) -> Option<String> {
        self.inner.stored.borrow().clone()
    }

    pub fn is_killed(&self) -> bool {
        self.inner.killed.get()
    }

    /// Stops the router: the store subscription is released, the transport
    /// is killed and the store can be bound again. Calling it twice is a
    /// no-op.
    pub fn kill(&self) {
        self.inner.kill();
    }
}

impl<S: StateStore + 'static> Drop for Router<S> {
    fn drop(&mut self) {
        self.inner.kill();
    }
}

impl<S: StateStore + 'static> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.inner.tree)
            .field("current_url", &self.inner.stored.borrow())
            .field("killed", &self.inner.killed.get())
            .finish()
    }
}

// A unit of reconciliation work.
#[derive(Debug)]
enum Pass {
    Url(String),
    State,
}

// How a route is matched against the state.
#[derive(Clone, Copy)]
enum Mode<'a> {
    Root,
    Child,
    // only the read-only values of the state are considered
    Recovery(&'a Value),
}

struct Inner<S> {
    store: Rc<S>,
    tree: RouteTree,
    transport: RefCell<Box<dyn UrlTransport>>,
    subscription: RefCell<Option<Subscription>>,
    // the last URL observed or shown, reset before a recovery
    stored: RefCell<Option<String>>,
    queue: RefCell<VecDeque<Pass>>,
    busy: Cell<bool>,
    killed: Cell<bool>,
}

impl<S: StateStore> Inner<S> {
    // Queues a pass and, unless a pass is already running, drains the queue.
    // Store and transport notifications arriving during a pass only queue.
    fn schedule(&self, pass: Pass) {
        if self.killed.get() {
            return;
        }

        self.queue.borrow_mut().push_back(pass);
        self.drain();
    }

    fn drain(&self) {
        if self.busy.replace(true) {
            return;
        }

        let mut passes = 0;
        while !self.killed.get() {
            let next = self.queue.borrow_mut().pop_front();
            let Some(pass) = next else { break };

            if passes == MAX_PASSES {
                let dropped = self.queue.borrow().len() + 1;
                self.queue.borrow_mut().clear();
                warn!(dropped, "reconciliation did not settle after {} passes", MAX_PASSES);
                break;
            }
            passes += 1;

            match pass {
                Pass::Url(url) => {
                    self.check_url(self.tree.root(), &url);
                }
                Pass::State => {
                    let state = self
                        .store
                        .get(&[])
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    self.check_state(self.tree.root(), &state, Mode::Root);
                }
            }
        }

        self.busy.set(false);
    }

    fn url_changed(&self, url: &str) {
        if self.stored.borrow().as_deref() == Some(url) {
            return;
        }
        self.reconcile_url(url.to_owned());
    }

    fn reconcile_url(&self, url: String) {
        *self.stored.borrow_mut() = Some(url.clone());
        self.schedule(Pass::Url(url));
    }

    // Shows a URL and reconciles the state with it. Nothing happens if the
    // URL is already shown, unless forced.
    fn update_url(&self, url: String, force: bool) {
        if !force && self.stored.borrow().as_deref() == Some(url.as_str()) {
            return;
        }

        *self.stored.borrow_mut() = Some(url.clone());
        self.transport.borrow_mut().update_url(&url, force);
        self.schedule(Pass::Url(url));
    }

    fn check_url(&self, route: &CompiledRoute, url: &str) -> bool {
        let solver = self.tree.solver();
        if !solver.matches(route.full_path(), url) {
            return false;
        }

        if route.children().iter().any(|child| self.check_url(child, url)) {
            return true;
        }

        if let Some(default) = route.full_default_path() {
            let target = solver.overlay(default, url);
            debug!(url, route = %route.full_path(), default = %target, "redirecting to the default route");
            self.update_url(target, false);
            return true;
        }

        debug!(url, route = %route.full_path(), "url matched");
        self.apply(route, url);
        true
    }

    // Writes the values of a route to the store, committing only if one of
    // them actually changed.
    fn apply(&self, route: &CompiledRoute, url: &str) {
        let solver = self.tree.solver();
        let query = parse_query(url, route.query());

        let mut changed = false;
        let mut unchanged = false;

        for update in route.updates() {
            if self.tree.is_read_only(&update.path) {
                trace!(path = %display_path(&update.path), "skipping read-only path");
                continue;
            }

            let value = match &update.binding {
                Binding::Literal(value) => value.clone(),
                Binding::Placeholder { name, .. } => solver
                    .segment_value(route.full_path(), url, name)
                    .map(Value::String)
                    .or_else(|| query.get(name).cloned())
                    .unwrap_or(Value::Null),
            };

            match self.store.get(&update.path) {
                Some(current) if same_value(&current, &value) => unchanged = true,
                _ => {
                    trace!(path = %display_path(&update.path), %value, "writing state");
                    self.store.set(&update.path, value);
                    changed = true;
                }
            }
        }

        if changed {
            self.store.commit();
        } else if unchanged {
            // the state already holds this route's values, but the URL may
            // not be the canonical one for it
            self.schedule(Pass::State);
        }
    }

    fn check_state(&self, route: &CompiledRoute, state: &Value, mode: Mode<'_>) -> bool {
        let constraint: &Constraint = route.constraint();
        let captures = match mode {
            Mode::Recovery(required) => constraint.admits(required).then(Captures::new),
            Mode::Root | Mode::Child => constraint.captures(state),
        };

        let is_root = matches!(mode, Mode::Root);
        if captures.is_none() && !is_root && !route.overrides() {
            return false;
        }

        if route
            .children()
            .iter()
            .any(|child| self.check_state(child, state, Mode::Child))
        {
            return true;
        }

        if is_root {
            // nothing matched: the next URL has to be shown, even if unchanged
            *self.stored.borrow_mut() = None;

            // read-only paths holding a mapping or a sequence are kept whole
            let required = self.read_only_state(state);
            debug!(read_only = %required, "no route matches the state, recovering");
            if route
                .children()
                .iter()
                .any(|child| self.check_state(child, state, Mode::Recovery(&required)))
            {
                return true;
            }
        }

        let Some(captures) = captures else {
            return false;
        };

        let query: IndexMap<String, Value> = route
            .query()
            .iter()
            .map(|(key, binding)| {
                let value = captures.get(&binding.name).cloned().unwrap_or(Value::Null);
                (key.clone(), value)
            })
            .collect();

        let template = route.full_default_path().unwrap_or(route.full_path());
        let url = resolve_url(template, &captures, &query);
        debug!(route = %route.full_path(), url = %url, "state matched");

        // a default route may come from an invalid state: force the URL pass
        // so the state gets fixed even if the URL does not change
        self.update_url(url, route.full_default_path().is_some());
        true
    }

    // The read-only values of the state, at their paths.
    fn read_only_state(&self, state: &Value) -> Value {
        let mut required = Value::Object(Map::new());
        for path in self.tree.read_only() {
            if let Some(value) = lookup(state, path) {
                assign(&mut required, path, value.clone());
            }
        }
        required
    }

    fn kill(&self) {
        if self.killed.replace(true) {
            return;
        }

        self.queue.borrow_mut().clear();
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
        self.transport.borrow_mut().kill();
        self.store.unbind_router();
        debug!("router killed");
    }
}
