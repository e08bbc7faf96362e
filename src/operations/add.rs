//! Route registration: tree insertion and route replacement.

use crate::context::{Node, Router};
use crate::error::RouterError;
use crate::operations::remove::{Removed, remove_tokens};
use crate::operations::util::common_prefix_len;
use crate::pattern::{Pattern, Token};
use crate::types::{Route, RouteOptions};
use std::sync::Arc;

/// Adds a route with default [`RouteOptions`].
///
/// The pattern may carry a host region (`api.example.com/users`), `{name}`
/// parameters, `{name:regex}` constrained parameters and `*{name}`
/// wildcards. See [`add_route_with`] for the full behavior.
///
/// # Errors
/// * [`RouterError::PatternInvalid`] / [`RouterError::RegexCompile`] when
///   the pattern does not parse.
/// * [`RouterError::RouteExists`] when the pattern already owns a route for
///   this method.
pub fn add_route<T>(
    router: &Router<T>,
    method: &str,
    pattern: &str,
    data: T,
) -> Result<(), RouterError> {
    add_route_with(router, method, pattern, data, RouteOptions::default())
}

/// Adds a route with explicit [`RouteOptions`].
///
/// The registration walks the method trie, splitting static edges at the
/// longest common prefix where patterns diverge, and attaches the route to
/// the final node. The rebuilt spine is published atomically: concurrent
/// lookups observe either the tree before this call or the tree after it,
/// never an intermediate state.
///
/// Methods are stored uppercase; lookups are expected to pass the method
/// uppercase as well.
pub fn add_route_with<T>(
    router: &Router<T>,
    method: &str,
    pattern: &str,
    data: T,
    options: RouteOptions,
) -> Result<(), RouterError> {
    let parsed = Pattern::parse(pattern)?;
    let method = method.to_ascii_uppercase();
    let route = Arc::new(Route::new(
        parsed.render(),
        parsed.param_names.clone(),
        data,
        options,
    ));

    let _writer = router.write.lock();
    let current = router.table.load_full();
    let root = match current.get(&method) {
        Some(root) => insert_tokens(root, &parsed.tokens, &method, route)?,
        None => insert_tokens(&Node::root(), &parsed.tokens, &method, route)?,
    };
    let mut table = (*current).clone();
    table.insert(method.clone(), Arc::new(root));
    router.publish(table);
    tracing::debug!(%method, pattern, "registered route");
    Ok(())
}

/// Replaces the route at `pattern` with default [`RouteOptions`]. See
/// [`update_route_with`].
pub fn update_route<T>(
    router: &Router<T>,
    method: &str,
    pattern: &str,
    data: T,
) -> Result<(), RouterError> {
    update_route_with(router, method, pattern, data, RouteOptions::default())
}

/// Replaces an existing route: delete and re-insert as one writer step
/// with a single publication, so concurrent lookups observe either the old
/// route or the new one, never an intermediate tree.
///
/// # Errors
/// [`RouterError::RouteNotFound`] when the pattern owns no route for this
/// method.
pub fn update_route_with<T>(
    router: &Router<T>,
    method: &str,
    pattern: &str,
    data: T,
    options: RouteOptions,
) -> Result<(), RouterError> {
    let parsed = Pattern::parse(pattern)?;
    let method = method.to_ascii_uppercase();
    let route = Arc::new(Route::new(
        parsed.render(),
        parsed.param_names.clone(),
        data,
        options,
    ));

    let _writer = router.write.lock();
    let current = router.table.load_full();
    let not_found = || RouterError::RouteNotFound {
        method: method.clone(),
        pattern: pattern.to_string(),
    };
    let root = current.get(&method).ok_or_else(not_found)?;
    let base = match remove_tokens(root, &parsed.tokens).ok_or_else(not_found)? {
        Removed::Kept(node) => node,
        Removed::Dropped => Node::root(),
    };
    let root = insert_tokens(&base, &parsed.tokens, &method, route)?;
    let mut table = (*current).clone();
    table.insert(method.clone(), Arc::new(root));
    router.publish(table);
    tracing::debug!(%method, pattern, "replaced route");
    Ok(())
}

pub(crate) fn insert_tokens<T>(
    root: &Node<T>,
    tokens: &[Token],
    method: &str,
    route: Arc<Route<T>>,
) -> Result<Node<T>, RouterError> {
    insert_rec(root, "", false, tokens, method, route)
}

/// Inserts the remaining pattern below `node`, copy-on-write: the returned
/// node is a fresh spine that shares every untouched subtree with the
/// input by `Arc`.
///
/// `lit` is the unconsumed tail of the current static token; when it is
/// empty the next token is taken from `rest`.
fn insert_rec<T>(
    node: &Node<T>,
    lit: &str,
    lit_host: bool,
    rest: &[Token],
    method: &str,
    route: Arc<Route<T>>,
) -> Result<Node<T>, RouterError> {
    if lit.is_empty() {
        return match rest.split_first() {
            None => {
                if node.route.is_some() {
                    return Err(RouterError::RouteExists {
                        method: method.to_string(),
                        pattern: route.pattern().to_string(),
                    });
                }
                let mut updated = node.clone();
                updated.route = Some(route);
                Ok(updated)
            }
            Some((Token::Static { text, host }, tail)) => {
                insert_rec(node, text, *host, tail, method, route)
            }
            Some((Token::Param { gate, host, .. }, tail)) => {
                let key = gate.as_ref().map_or("?", |g| g.source.as_str());
                let mut updated = node.clone();
                match node.params.iter().position(|c| c.key == key) {
                    Some(i) => {
                        let rebuilt =
                            insert_rec(node.params[i].as_ref(), "", false, tail, method, route)?;
                        updated.params[i] = Arc::new(rebuilt);
                    }
                    None => {
                        let child = Node::new_param(
                            key.to_string(),
                            gate.as_ref().map(|g| g.re.clone()),
                            *host,
                        );
                        let built = insert_rec(&child, "", false, tail, method, route)?;
                        updated.add_param(Arc::new(built));
                    }
                }
                Ok(updated)
            }
            Some((Token::Wildcard { gate, .. }, tail)) => {
                let key = gate.as_ref().map_or("*", |g| g.source.as_str());
                let mut updated = node.clone();
                match node.wildcards.iter().position(|c| c.key == key) {
                    Some(i) => {
                        let rebuilt =
                            insert_rec(node.wildcards[i].as_ref(), "", false, tail, method, route)?;
                        updated.wildcards[i] = Arc::new(rebuilt);
                    }
                    None => {
                        let child = Node::new_wildcard(
                            key.to_string(),
                            gate.as_ref().map(|g| g.re.clone()),
                        );
                        let built = insert_rec(&child, "", false, tail, method, route)?;
                        updated.add_wildcard(Arc::new(built));
                    }
                }
                Ok(updated)
            }
        };
    }

    let label = if lit_host {
        lit.as_bytes()[0].to_ascii_lowercase()
    } else {
        lit.as_bytes()[0]
    };
    let mut updated = node.clone();
    match node.static_position(label) {
        Err(_) => {
            updated.set_static(Arc::new(chain(lit, lit_host, rest, route)));
            Ok(updated)
        }
        Ok(i) => {
            let child = node.statics[i].as_ref();
            let lcp = common_prefix_len(lit, &child.key, lit_host);
            if lcp == 0 {
                // Shared label but no shared character: the patterns
                // diverge inside a multibyte character and the keys cannot
                // represent the split point.
                return Err(RouterError::PatternInvalid {
                    pattern: route.pattern().to_string(),
                    reason: "pattern diverges inside a multibyte character".to_string(),
                });
            }
            let rebuilt = if lcp == child.key.len() {
                // The child's key is fully consumed: descend.
                insert_rec(child, &lit[lcp..], lit_host, rest, method, route)?
            } else {
                // Split the child at the boundary: a new node owns the
                // shared prefix, the old child keeps the suffix with its
                // whole subtree intact.
                let mut suffix = child.clone();
                suffix.key = child.key[lcp..].to_string();
                suffix.label = suffix.key.as_bytes()[0];
                let mut split = Node::new_static(child.key[..lcp].to_string(), child.host);
                split.set_static(Arc::new(suffix));
                insert_rec(&split, &lit[lcp..], lit_host, rest, method, route)?
            };
            updated.statics[i] = Arc::new(rebuilt);
            Ok(updated)
        }
    }
}

/// Builds a fresh subtree for a literal and every following token. Nothing
/// down here can conflict, so this path is infallible.
fn chain<T>(lit: &str, host: bool, rest: &[Token], route: Arc<Route<T>>) -> Node<T> {
    let mut node = Node::new_static(lit.to_string(), host);
    extend_chain(&mut node, rest, route);
    node
}

fn extend_chain<T>(node: &mut Node<T>, rest: &[Token], route: Arc<Route<T>>) {
    match rest.split_first() {
        None => node.route = Some(route),
        Some((Token::Static { text, host }, tail)) => {
            node.set_static(Arc::new(chain(text, *host, tail, route)));
        }
        Some((Token::Param { gate, host, .. }, tail)) => {
            let key = gate.as_ref().map_or("?", |g| g.source.as_str());
            let mut child =
                Node::new_param(key.to_string(), gate.as_ref().map(|g| g.re.clone()), *host);
            extend_chain(&mut child, tail, route);
            node.add_param(Arc::new(child));
        }
        Some((Token::Wildcard { gate, .. }, tail)) => {
            let key = gate.as_ref().map_or("*", |g| g.source.as_str());
            let mut child =
                Node::new_wildcard(key.to_string(), gate.as_ref().map(|g| g.re.clone()));
            extend_chain(&mut child, tail, route);
            node.add_wildcard(Arc::new(child));
        }
    }
}
