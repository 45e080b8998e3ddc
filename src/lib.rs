//! Keeps an application state tree and a URL consistent, in both
//! directions, through a declarative route tree.
//!
//! Routes declare a URL fragment and the state values they imply:
//!
//! ```rust
//! use serde_json::json;
//! use stateroute::{RouteDeclaration, RouteTree, Solver};
//!
//! let routes = RouteDeclaration::root("/login")
//!     .with_read_only(["logged"])
//!     .with_route(RouteDeclaration::new("/login").with_state(json!({ "logged": false })))
//!     .with_route(
//!         RouteDeclaration::root("/home")
//!             .with_state(json!({ "logged": true }))
//!             .with_route(RouteDeclaration::new("/home").with_state(json!({ "view": "home" })))
//!             .with_route(
//!                 RouteDeclaration::new("/project/:pid")
//!                     .with_state(json!({ "view": "project", "pid": ":pid" })),
//!             ),
//!     );
//!
//! let tree = RouteTree::compile(&routes, Solver::default())?;
//! let project = &tree.root().children()[1].children()[1];
//!
//! assert_eq!(project.full_path(), "/project/:pid");
//! assert_eq!(project.constraints(), &json!({ "logged": true, "view": "project", "pid": ":pid" }));
//! # Ok::<(), stateroute::ConfigError>(())
//! ```
//!
//! A [`Router`] then binds a [`StateStore`] to a [`UrlTransport`]: URL changes
//! select a route and write its values to the store, store changes select a
//! route and show its URL. See the [`router`] module for a complete example.
//!
//! Placeholder segments (`:pid` by default, any syntax through a custom
//! [`Solver`]) capture a state value. Query keys can be bound to placeholders
//! as well, optionally cast to numbers or booleans:
//!
//! ```rust
//! use stateroute::{Cast, RouteDeclaration};
//!
//! let search = RouteDeclaration::from_json(r#"{
//!     "path": "/search",
//!     "state": { "view": "search", "q": ":q", "page": ":page" },
//!     "query": { "q": ":q", "page": { "match": ":page", "cast": "number" } }
//! }"#)?;
//!
//! assert_eq!(search.query["page"].cast, Cast::Number);
//! # Ok::<(), stateroute::ConfigError>(())
//! ```
#![deny(clippy::all)]
#![forbid(unsafe_code)]

pub mod constraint;
mod error;
pub mod escape;
pub mod extract;
pub mod merge;
mod params;
pub mod path;
mod route;
pub mod router;
pub mod store;
pub mod transport;
mod tree;
pub mod url;

pub use constraint::Constraint;
pub use error::ConfigError;
pub use params::Captures;
pub use path::{state_path, Key, StatePath};
pub use route::{Cast, QueryParam, RouteDeclaration};
pub use router::{Router, Settings};
pub use store::{MemoryStore, StateStore, Subscription};
pub use transport::{MemoryTransport, UrlTransport};
pub use tree::{CompiledRoute, RouteTree};
pub use url::Solver;
