//! Route removal: leaf clearing, pruning and edge re-merging.

use crate::context::{Node, Router};
use crate::error::RouterError;
use crate::pattern::{Pattern, Token};
use std::sync::Arc;

/// Removes the route registered at exactly `pattern`.
///
/// The pattern is re-parsed and the tree descended by exact key equality,
/// so removal targets the same leaf the registration produced. Emptied
/// nodes are pruned on the way back up, and a parent left with a single
/// static child is merged with it again (never across the host/path
/// boundary), undoing the split the registration introduced.
///
/// Like every write, the rebuilt tree is published atomically.
///
/// # Errors
/// [`RouterError::RouteNotFound`] when no route is registered for this
/// method and pattern.
pub fn remove_route<T>(
    router: &Router<T>,
    method: &str,
    pattern: &str,
) -> Result<(), RouterError> {
    let parsed = Pattern::parse(pattern)?;
    let method = method.to_ascii_uppercase();
    let not_found = || RouterError::RouteNotFound {
        method: method.clone(),
        pattern: pattern.to_string(),
    };

    let _writer = router.write.lock();
    let current = router.table.load_full();
    let root = current.get(&method).ok_or_else(not_found)?;
    let outcome = remove_tokens(root, &parsed.tokens).ok_or_else(not_found)?;
    let mut table = (*current).clone();
    match outcome {
        Removed::Dropped => {
            table.shift_remove(&method);
        }
        Removed::Kept(root) => {
            table.insert(method.clone(), Arc::new(root));
        }
    }
    router.publish(table);
    tracing::debug!(%method, pattern, "removed route");
    Ok(())
}

/// The rebuilt subtree after a removal.
pub(crate) enum Removed<T> {
    /// The subtree survives in this (copy-on-write) form.
    Kept(Node<T>),
    /// The subtree became empty; the parent must drop the edge.
    Dropped,
}

/// Removes the leaf addressed by `tokens` below `root`. Returns `None`
/// when the pattern does not address a leaf.
pub(crate) fn remove_tokens<T>(root: &Node<T>, tokens: &[Token]) -> Option<Removed<T>> {
    remove_rec(root, "", false, tokens)
}

fn remove_rec<T>(
    node: &Node<T>,
    lit: &str,
    lit_host: bool,
    rest: &[Token],
) -> Option<Removed<T>> {
    if lit.is_empty() {
        return match rest.split_first() {
            None => {
                node.route.as_ref()?;
                if node.statics.is_empty() && node.params.is_empty() && node.wildcards.is_empty() {
                    Some(Removed::Dropped)
                } else {
                    let mut updated = node.clone();
                    updated.route = None;
                    Some(Removed::Kept(updated))
                }
            }
            Some((Token::Static { text, host }, tail)) => remove_rec(node, text, *host, tail),
            Some((Token::Param { gate, .. }, tail)) => {
                let key = gate.as_ref().map_or("?", |g| g.source.as_str());
                let i = node.params.iter().position(|c| c.key == key)?;
                let mut updated = node.clone();
                match remove_rec(node.params[i].as_ref(), "", false, tail)? {
                    Removed::Dropped => {
                        updated.params.remove(i);
                    }
                    Removed::Kept(child) => updated.params[i] = Arc::new(child),
                }
                Some(normalize(updated))
            }
            Some((Token::Wildcard { gate, .. }, tail)) => {
                let key = gate.as_ref().map_or("*", |g| g.source.as_str());
                let i = node.wildcards.iter().position(|c| c.key == key)?;
                let mut updated = node.clone();
                match remove_rec(node.wildcards[i].as_ref(), "", false, tail)? {
                    Removed::Dropped => {
                        updated.wildcards.remove(i);
                    }
                    Removed::Kept(child) => updated.wildcards[i] = Arc::new(child),
                }
                Some(normalize(updated))
            }
        };
    }

    // Static descent: the child's key must be exactly the next chunk of
    // the literal, compared case-insensitively in the host region.
    let label = if lit_host {
        lit.as_bytes()[0].to_ascii_lowercase()
    } else {
        lit.as_bytes()[0]
    };
    let i = node.static_position(label).ok()?;
    let child = node.statics[i].as_ref();
    if child.key.len() > lit.len() {
        return None;
    }
    // Byte comparison: the cut may not be a character boundary of `lit`
    // until the keys are known to agree.
    let head = &lit.as_bytes()[..child.key.len()];
    let matches = if lit_host {
        head.eq_ignore_ascii_case(child.key.as_bytes())
    } else {
        head == child.key.as_bytes()
    };
    if !matches {
        return None;
    }

    let mut updated = node.clone();
    match remove_rec(child, &lit[child.key.len()..], lit_host, rest)? {
        Removed::Dropped => updated.remove_static(label),
        Removed::Kept(rebuilt) => updated.statics[i] = Arc::new(rebuilt),
    }
    Some(normalize(updated))
}

/// Post-removal cleanup of one rebuilt node: propagate the prune when it
/// became empty, or merge a lone static child back into it.
fn normalize<T>(node: Node<T>) -> Removed<T> {
    if node.route.is_none()
        && node.statics.is_empty()
        && node.params.is_empty()
        && node.wildcards.is_empty()
    {
        return Removed::Dropped;
    }
    merge_single_static(node)
}

/// Undoes an insertion split: a non-leaf static node whose only remaining
/// child is a static edge of the same region absorbs the child's key. The
/// root (`label == 0`) and param/wildcard nodes never merge, and a host
/// edge never absorbs a path edge.
fn merge_single_static<T>(node: Node<T>) -> Removed<T> {
    let mergeable = node.label != 0
        && node.route.is_none()
        && node.params.is_empty()
        && node.wildcards.is_empty()
        && node.statics.len() == 1
        && node.statics[0].host == node.host;
    if !mergeable {
        return Removed::Kept(node);
    }
    let child = node.statics[0].as_ref();
    let mut merged = child.clone();
    merged.key = format!("{}{}", node.key, child.key);
    merged.label = node.label;
    Removed::Kept(merged)
}
