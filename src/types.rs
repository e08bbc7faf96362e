//! Contains type definitions used throughout the arbor router.
//!
//! This module defines the registered route record, the per-route options,
//! the client-IP resolver hook and the result of a route match.

use crate::context::PooledContext;
use crate::error::RouterError;
use ahash::AHashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Derives the effective client address for a matched route.
///
/// The strategy itself (trusted proxies, forwarded headers, CIDR allow
/// lists) lives outside the router core; the core only carries the hook on
/// the route and reports [`RouterError::NoClientIpResolver`] when a caller
/// asks for resolution on a route that has none. The helpers in
/// [`operations::util`](crate::operations::util) (`parse_cidr`,
/// `split_host_zone`, `strip_host_port`) are the support surface for
/// implementations.
pub trait ClientIpResolver: Send + Sync {
    /// Resolves the client address for a connection seen from `remote`.
    /// Returning `None` falls back to `remote` itself.
    fn resolve(&self, remote: IpAddr) -> Option<IpAddr>;
}

/// Per-route behavior flags supplied at registration.
#[derive(Clone, Default)]
pub struct RouteOptions {
    /// When a lookup only succeeds by adding or stripping one trailing
    /// slash, advise the caller to answer with a 301 to the adjusted path.
    pub redirect_trailing_slash: bool,
    /// When a lookup only succeeds by adding or stripping one trailing
    /// slash, advise the caller to treat it as an exact match.
    pub ignore_trailing_slash: bool,
    /// Optional client-IP resolution strategy for this route.
    pub client_ip: Option<Arc<dyn ClientIpResolver>>,
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("redirect_trailing_slash", &self.redirect_trailing_slash)
            .field("ignore_trailing_slash", &self.ignore_trailing_slash)
            .field("client_ip", &self.client_ip.is_some())
            .finish()
    }
}

/// A registered route: the terminal record owned by exactly one leaf node.
///
/// `T` is the handler value and stays opaque to the router.
pub struct Route<T> {
    pattern: String,
    param_names: Vec<String>,
    data: T,
    redirect_trailing_slash: bool,
    ignore_trailing_slash: bool,
    client_ip: Option<Arc<dyn ClientIpResolver>>,
}

impl<T> Route<T> {
    pub(crate) fn new(
        pattern: String,
        param_names: Vec<String>,
        data: T,
        options: RouteOptions,
    ) -> Self {
        Self {
            pattern,
            param_names,
            data,
            redirect_trailing_slash: options.redirect_trailing_slash,
            ignore_trailing_slash: options.ignore_trailing_slash,
            client_ip: options.client_ip,
        }
    }

    /// The canonical pattern string this route was registered under.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parameter names in declaration order, host region first.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// The handler value supplied at registration.
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn redirect_trailing_slash(&self) -> bool {
        self.redirect_trailing_slash
    }

    pub fn ignore_trailing_slash(&self) -> bool {
        self.ignore_trailing_slash
    }

    pub(crate) fn client_ip_resolver(&self) -> Option<&Arc<dyn ClientIpResolver>> {
        self.client_ip.as_ref()
    }
}

impl<T: fmt::Debug> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("param_names", &self.param_names)
            .field("data", &self.data)
            .field("redirect_trailing_slash", &self.redirect_trailing_slash)
            .field("ignore_trailing_slash", &self.ignore_trailing_slash)
            .field("client_ip", &self.client_ip.is_some())
            .finish()
    }
}

/// Represents a successfully matched route.
///
/// Captured parameter segments live in pooled buffers; dropping the match
/// truncates them and hands the buffers back to the router's pool, on every
/// exit path including unwinding.
pub struct MatchedRoute<'r, T> {
    pub(crate) route: Arc<Route<T>>,
    pub(crate) tsr: bool,
    pub(crate) ctx: PooledContext<'r>,
}

impl<'r, T> MatchedRoute<'r, T> {
    pub(crate) fn new(route: Arc<Route<T>>, tsr: bool, ctx: PooledContext<'r>) -> Self {
        Self { route, tsr, ctx }
    }

    /// The matched route record.
    pub fn route(&self) -> &Route<T> {
        &self.route
    }

    /// The handler value of the matched route.
    pub fn data(&self) -> &T {
        self.route.data()
    }

    /// The canonical pattern of the matched route.
    pub fn pattern(&self) -> &str {
        self.route.pattern()
    }

    /// True iff this match is a trailing-slash salvage: the route was found
    /// by adding or stripping exactly one trailing `/`. Consult
    /// [`Route::redirect_trailing_slash`] and
    /// [`Route::ignore_trailing_slash`] to decide between a 301, an exact
    /// match and a 404.
    pub fn tsr(&self) -> bool {
        self.tsr
    }

    /// Captured segments in declaration order.
    pub fn captures(&self) -> &[String] {
        self.ctx.ctx.captures(self.tsr)
    }

    /// Iterates `(name, captured_text)` pairs in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.route
            .param_names()
            .iter()
            .map(String::as_str)
            .zip(self.captures().iter().map(String::as_str))
    }

    /// The capture for the parameter named `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Collects the captures into an owned name→value map.
    pub fn params_map(&self) -> AHashMap<String, String> {
        self.params()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    /// Resolves the client address through the route's resolver, falling
    /// back to `remote` when the resolver abstains.
    ///
    /// # Errors
    /// [`RouterError::NoClientIpResolver`] when the route carries no
    /// resolver.
    pub fn client_ip(&self, remote: IpAddr) -> Result<IpAddr, RouterError> {
        match self.route.client_ip_resolver() {
            Some(resolver) => Ok(resolver.resolve(remote).unwrap_or(remote)),
            None => Err(RouterError::NoClientIpResolver),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MatchedRoute<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchedRoute")
            .field("pattern", &self.route.pattern())
            .field("tsr", &self.tsr)
            .field("captures", &self.captures())
            .finish()
    }
}
