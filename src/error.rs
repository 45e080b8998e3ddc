/// Represents errors that can occur when building a router.
///
/// All of them are fatal: they are reported once, synchronously, when the
/// route declarations are compiled or the router is bound to its store.
/// A URL or a state that matches no route at runtime is never an error.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The root route does not declare a default route.
    #[error("the root route must have a default route")]
    MissingRootDefault,
    /// A default route does not match any of the route's children.
    #[error("the default route \"{default}\" of route \"{route}\" does not match any registered route")]
    UnmatchedDefault {
        /// The full path of the route declaring the default route.
        route: String,
        /// The declared default route.
        default: String,
    },
    /// A route declares neither a path nor a default route.
    #[error("route \"{route}\" must have either a path or a default route")]
    MissingPathOrDefault {
        /// The full path the route would have.
        route: String,
    },
    /// A route other than the root does not constrain the state.
    #[error("route \"{route}\" must have some state restrictions")]
    MissingUpdates {
        /// The full path of the route.
        route: String,
    },
    /// The state store is already bound to another router.
    #[error("a router has already been bound to this store")]
    StoreAlreadyBound,
    /// The placeholder pattern is not a valid regular expression.
    #[error("invalid placeholder pattern: {0}")]
    InvalidPattern(String),
    /// The route declarations could not be parsed.
    #[error("invalid route declaration: {0}")]
    Parse(String),
}
