//! Defines the error types used throughout the `arbor` crate.

use thiserror::Error;

/// The primary error type for `arbor` operations.
///
/// Registration (`add_route`, `remove_route`, `update_route`) surfaces these
/// directly. Lookups never error: a miss is reported as `None`, not as an
/// error value.
#[derive(Error, Debug, Clone)]
pub enum RouterError {
    /// The registration pattern is syntactically invalid: bad braces,
    /// duplicate parameter names, a wildcard in the host region, an empty
    /// interior segment, or a missing path.
    #[error("invalid route pattern '{pattern}': {reason}")]
    PatternInvalid {
        /// The offending pattern.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// A `{name:regex}` or `*{name:regex}` constraint failed to compile.
    /// Constraints are compiled eagerly, so this fails the registration.
    #[error("invalid regex '{pattern}' in route pattern: {error}")]
    RegexCompile {
        /// The regex source text as written in the pattern.
        pattern: String,
        /// The underlying compile error.
        error: regex::Error,
    },

    /// The pattern already owns a route for this method. Replace routes
    /// through [`update_route`](crate::update_route) instead.
    #[error("route already registered for method '{method}' and pattern '{pattern}'")]
    RouteExists {
        /// The HTTP method of the conflicting registration.
        method: String,
        /// The canonical pattern of the conflicting registration.
        pattern: String,
    },

    /// No route is registered for the given method and pattern.
    #[error("no route registered for method '{method}' and pattern '{pattern}'")]
    RouteNotFound {
        /// The HTTP method that was targeted.
        method: String,
        /// The pattern that was targeted.
        pattern: String,
    },

    /// Client-IP resolution was requested on a matched route that carries
    /// no resolver.
    #[error("no client ip resolver configured for the matched route")]
    NoClientIpResolver,
}
