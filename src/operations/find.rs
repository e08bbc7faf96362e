//! The lookup engine: a single-pass walk with an explicit backtracking
//! stack.
//!
//! At every node the walker tries, in order: the static child addressed by
//! the next byte, parameter edges (gated edges first, the plain `"?"`
//! last), then wildcard edges — infix wildcards (those with static
//! continuations) before suffix wildcards. Before descending past untried
//! alternatives it pushes a resume frame; a dead end pops the most recent
//! frame, truncates the captures taken since, and retries the remaining
//! alternatives with the already-visited static child skipped.
//!
//! Trailing-slash salvage (TSR): while walking, the engine records the
//! first leaf reachable by adding or stripping exactly one trailing `/`.
//! An exact match always supersedes the candidate; the caller decides what
//! a salvage means through the route's trailing-slash flags.

use crate::context::{LookupContext, MethodTable, Node, Router};
use crate::operations::util::{equal_ascii_ignore_case, strip_host_port};
use crate::types::{MatchedRoute, Route};
use std::sync::Arc;

/// Finds the route matching `(method, hostport, path)`.
///
/// `hostport` is the raw `Host` header value; port, brackets and a
/// trailing dot are stripped before host matching, and hostname statics
/// compare ASCII case-insensitively. An empty `hostport` (or a tree with
/// no host patterns at all) goes straight to path matching. Routes without
/// a host region match any host; a host walk that fails entirely falls
/// back to them.
///
/// Captured segments are available on the returned [`MatchedRoute`] in
/// declaration order. [`MatchedRoute::tsr`] is true when the route was
/// found by adjusting one trailing slash.
///
/// A lookup never errors and never blocks: it loads the published tree
/// once and traverses immutable nodes.
pub fn find_route<'r, T>(
    router: &'r Router<T>,
    method: &str,
    hostport: &str,
    path: &str,
) -> Option<MatchedRoute<'r, T>> {
    let table = router.table.load_full();
    find_in(router, &table, method, hostport, path)
}

pub(crate) fn find_in<'r, T>(
    router: &'r Router<T>,
    table: &MethodTable<T>,
    method: &str,
    hostport: &str,
    path: &str,
) -> Option<MatchedRoute<'r, T>> {
    let root = table.get(method)?;
    let mut ctx = router.pool.acquire();
    let mut tsr = None;

    let exact = lookup(root, hostport, path, &mut ctx.ctx, &mut tsr);
    match exact {
        Some(route) => Some(MatchedRoute::new(route, false, ctx)),
        None => tsr.map(|route| MatchedRoute::new(route, true, ctx)),
    }
}

fn lookup<T>(
    root: &Node<T>,
    hostport: &str,
    path: &str,
    ctx: &mut LookupContext,
    tsr: &mut Option<Arc<Route<T>>>,
) -> Option<Arc<Route<T>>> {
    // Fast path: no host patterns registered for this method, so the host
    // can be ignored wholesale.
    let hostless =
        root.params.is_empty() && root.statics.len() == 1 && root.statics[0].label == b'/';

    if !hostless && !hostport.is_empty() {
        let host = strip_host_port(hostport);
        if !host.is_empty() {
            if let Some(found) = walk_host(root, host, path, ctx, tsr) {
                return Some(found);
            }
            if tsr.is_some() {
                // The host matched and its path walk found a salvage
                // candidate; that counts as the host walk succeeding.
                return None;
            }
            ctx.params.clear();
        }
    }
    walk_path(root, path, path, ctx, tsr)
}

/// A resume point for backtracking. `next_param` is the parameter edge to
/// try next at `node`; statics are always skipped on resume because the
/// matching static child was already taken.
struct Frame<'n, 's, T> {
    node: &'n Node<T>,
    search: &'s str,
    params_len: usize,
    next_param: usize,
}

/// Records the first trailing-slash salvage candidate: the current
/// captures (plus `extra`, for the wildcard salvage) are snapshotted into
/// the parallel buffer so later backtracking cannot disturb them.
fn record_tsr<T>(
    slot: &mut Option<Arc<Route<T>>>,
    node: &Node<T>,
    ctx: &mut LookupContext,
    extra: Option<&str>,
) {
    if slot.is_some() {
        return;
    }
    let Some(route) = &node.route else { return };
    ctx.tsr_params.clone_from(&ctx.params);
    if let Some(extra) = extra {
        ctx.tsr_params.push(extra.to_string());
    }
    *slot = Some(Arc::clone(route));
}

/// True when `search` starts with the child's key; host keys compare ASCII
/// case-insensitively. Returns the remainder on success.
fn strip_key<'s, T>(child: &Node<T>, search: &'s str) -> Option<&'s str> {
    let key = child.key.as_bytes();
    let s = search.as_bytes();
    if s.len() < key.len() {
        return None;
    }
    let matched = if child.host {
        key.iter().zip(&s[..key.len()]).all(|(a, b)| a.eq_ignore_ascii_case(b))
    } else {
        &s[..key.len()] == key
    };
    // Equal bytes, so the cut lands on a character boundary of `search`.
    matched.then(|| &search[child.key.len()..])
}

/// The path walker. `orig` is the full path of the enclosing lookup (cut
/// down neither by descent nor by wildcard recursion); it anchors the
/// `"//"` exclusion of the trailing-slash salvage.
fn walk_path<T>(
    start: &Node<T>,
    path: &str,
    orig: &str,
    ctx: &mut LookupContext,
    tsr: &mut Option<Arc<Route<T>>>,
) -> Option<Arc<Route<T>>> {
    let entry_params = ctx.params.len();
    let mut cur = start;
    let mut search = path;
    let mut next_param = 0usize;
    let mut skip_static = false;
    let mut stack: Vec<Frame<'_, '_, T>> = Vec::new();

    'walk: loop {
        if search.is_empty() {
            if let Some(route) = &cur.route {
                return Some(Arc::clone(route));
            }
            // Salvage: the path is one `/` short of a leaf.
            if let Some(child) = cur.find_static(b'/') {
                if child.key == "/" && child.route.is_some() {
                    record_tsr(tsr, child, ctx, None);
                }
            }
        } else {
            // Salvage: the path has one trailing `/` too many. `//` at the
            // end is excluded — stripping one slash still would not match.
            if search == "/" && cur.route.is_some() && !orig.ends_with("//") {
                record_tsr(tsr, cur, ctx, None);
            }

            if !skip_static {
                if let Some(child) = cur.find_static(search.as_bytes()[0]) {
                    if let Some(rest) = strip_key(child, search) {
                        if !cur.params.is_empty() || !cur.wildcards.is_empty() {
                            stack.push(Frame {
                                node: cur,
                                search,
                                params_len: ctx.params.len(),
                                next_param: 0,
                            });
                        }
                        cur = child.as_ref();
                        search = rest;
                        next_param = 0;
                        continue 'walk;
                    }
                    // Salvage: the child is the path plus one trailing `/`.
                    if child.route.is_some()
                        && child.key.len() == search.len() + 1
                        && child.key.as_bytes()[search.len()] == b'/'
                        && eq_region(&child.key.as_bytes()[..search.len()], search.as_bytes(), child.host)
                    {
                        record_tsr(tsr, child, ctx, None);
                    }
                }
            }

            if !cur.params.is_empty() {
                let seg_end = search.find('/').unwrap_or(search.len());
                // A parameter consumes one non-empty segment.
                if seg_end > 0 {
                    let segment = &search[..seg_end];
                    for i in next_param..cur.params.len() {
                        if !cur.params[i].gate_matches(segment) {
                            continue;
                        }
                        if i + 1 < cur.params.len() || !cur.wildcards.is_empty() {
                            stack.push(Frame {
                                node: cur,
                                search,
                                params_len: ctx.params.len(),
                                next_param: i + 1,
                            });
                        }
                        ctx.params.push(segment.to_string());
                        cur = cur.params[i].as_ref();
                        search = &search[seg_end..];
                        next_param = 0;
                        skip_static = false;
                        continue 'walk;
                    }
                }
            }

            if !cur.wildcards.is_empty() {
                // Infix wildcards first: place the cut at each `/` of the
                // remainder, shortest capture first, and match the static
                // tail below the wildcard. Empty captures are not allowed;
                // empty segments inside a capture are.
                for wild in &cur.wildcards {
                    if wild.statics.is_empty() {
                        continue;
                    }
                    for (cut, _) in search.match_indices('/') {
                        if cut == 0 {
                            continue;
                        }
                        let captured = &search[..cut];
                        if !wild.gate_matches(captured) {
                            continue;
                        }
                        let mark = ctx.params.len();
                        ctx.params.push(captured.to_string());
                        if let Some(found) =
                            walk_path(wild.as_ref(), &search[cut..], orig, ctx, tsr)
                        {
                            return Some(found);
                        }
                        ctx.params.truncate(mark);
                    }
                    // Salvage: no cut matched, but the wildcard's subtree
                    // ends in a `/` leaf; the whole remainder is the
                    // capture.
                    if tsr.is_none() {
                        if let Some(slash) = wild.find_static(b'/') {
                            if slash.key == "/" && slash.route.is_some() && wild.gate_matches(search)
                            {
                                record_tsr(tsr, slash, ctx, Some(search));
                            }
                        }
                    }
                }
                // Then suffix wildcards: the edge is itself a leaf and
                // captures the entire remainder.
                for wild in &cur.wildcards {
                    let Some(route) = &wild.route else { continue };
                    if !wild.gate_matches(search) {
                        continue;
                    }
                    ctx.params.push(search.to_string());
                    return Some(Arc::clone(route));
                }
            }
        }

        match stack.pop() {
            Some(frame) => {
                cur = frame.node;
                search = frame.search;
                ctx.params.truncate(frame.params_len);
                next_param = frame.next_param;
                skip_static = true;
            }
            None => {
                ctx.params.truncate(entry_params);
                return None;
            }
        }
    }
}

/// The host walker: the same skeleton over `.`-delimited labels with
/// case-insensitive statics and no wildcards. Once the host is fully
/// consumed it hands over to the path walker; captures from both walks
/// concatenate.
fn walk_host<T>(
    root: &Node<T>,
    host: &str,
    path: &str,
    ctx: &mut LookupContext,
    tsr: &mut Option<Arc<Route<T>>>,
) -> Option<Arc<Route<T>>> {
    let entry_params = ctx.params.len();
    let mut cur = root;
    let mut search = host;
    let mut next_param = 0usize;
    let mut skip_static = false;
    let mut stack: Vec<Frame<'_, '_, T>> = Vec::new();

    'walk: loop {
        if search.is_empty() {
            if let Some(found) = walk_path(cur, path, path, ctx, tsr) {
                return Some(found);
            }
        } else {
            if !skip_static {
                let label = search.as_bytes()[0].to_ascii_lowercase();
                if let Some(child) = cur.find_static(label) {
                    if let Some(rest) = strip_key(child, search) {
                        if !cur.params.is_empty() {
                            stack.push(Frame {
                                node: cur,
                                search,
                                params_len: ctx.params.len(),
                                next_param: 0,
                            });
                        }
                        cur = child.as_ref();
                        search = rest;
                        next_param = 0;
                        continue 'walk;
                    }
                }
            }

            if !cur.params.is_empty() {
                let seg_end = search.find('.').unwrap_or(search.len());
                if seg_end > 0 {
                    let label_text = &search[..seg_end];
                    for i in next_param..cur.params.len() {
                        if !cur.params[i].gate_matches(label_text) {
                            continue;
                        }
                        if i + 1 < cur.params.len() {
                            stack.push(Frame {
                                node: cur,
                                search,
                                params_len: ctx.params.len(),
                                next_param: i + 1,
                            });
                        }
                        ctx.params.push(label_text.to_string());
                        cur = cur.params[i].as_ref();
                        search = &search[seg_end..];
                        next_param = 0;
                        skip_static = false;
                        continue 'walk;
                    }
                }
            }
        }

        match stack.pop() {
            Some(frame) => {
                cur = frame.node;
                search = frame.search;
                ctx.params.truncate(frame.params_len);
                next_param = frame.next_param;
                skip_static = true;
            }
            None => {
                ctx.params.truncate(entry_params);
                return None;
            }
        }
    }
}

fn eq_region(a: &[u8], b: &[u8], host: bool) -> bool {
    if host {
        // Host keys are validated to the hostname alphabet at
        // registration, so the dedicated comparison applies.
        std::str::from_utf8(a)
            .ok()
            .zip(std::str::from_utf8(b).ok())
            .is_some_and(|(a, b)| equal_ascii_ignore_case(a, b))
    } else {
        a == b
    }
}
