//! Defines the core data structures for the router: the tree `Node`, the
//! `Router` with its atomically published method table, read `Snapshot`s
//! and the pooled lookup context.
//!
//! Every node is immutable once published. Writers rebuild the spine they
//! touch and swap in a new method→root table through one atomic store;
//! readers load the table once per lookup and traverse shared nodes without
//! taking any lock. Untouched subtrees are shared between versions by
//! `Arc`, and a version stays alive for as long as any reader still holds
//! it.

use crate::operations::find::find_in;
use crate::types::{MatchedRoute, Route};
use ahash::RandomState;
use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;

/// The published method→root mapping. Methods are stored uppercase.
pub(crate) type MethodTable<T> = IndexMap<String, Arc<Node<T>>, RandomState>;

/// One edge of the compressed trie.
///
/// `key` holds the literal text consumed by the edge for static nodes, the
/// placeholder `"?"` for a plain parameter, `"*"` for a plain wildcard, and
/// the regex source text for gated parameter/wildcard edges.
pub(crate) struct Node<T> {
    pub(crate) key: String,
    /// First byte of `key` for static nodes, `0` otherwise. Parents binary
    /// search their static children by this byte.
    pub(crate) label: u8,
    /// Compiled gate applied to the captured text before the edge matches.
    pub(crate) regexp: Option<Regex>,
    /// Static children, strictly sorted by label. Host children are
    /// ordered (and searched) by the lowercased label so the lookup can
    /// compare hostnames case-insensitively.
    pub(crate) statics: Vec<Arc<Node<T>>>,
    /// Parameter children: gated edges in insertion order, the plain `"?"`
    /// edge last if present.
    pub(crate) params: Vec<Arc<Node<T>>>,
    /// Wildcard children: gated edges in insertion order, the plain `"*"`
    /// edge last if present.
    pub(crate) wildcards: Vec<Arc<Node<T>>>,
    /// The route registered exactly at this node, if it is a leaf. A leaf
    /// may still have children.
    pub(crate) route: Option<Arc<Route<T>>>,
    /// True iff this edge belongs to the host region of its patterns.
    pub(crate) host: bool,
}

// Manual impl: cloning shares children and the route by refcount, so no
// `T: Clone` bound is wanted.
impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            label: self.label,
            regexp: self.regexp.clone(),
            statics: self.statics.clone(),
            params: self.params.clone(),
            wildcards: self.wildcards.clone(),
            route: self.route.clone(),
            host: self.host,
        }
    }
}

impl<T> Node<T> {
    fn empty(key: String, label: u8, regexp: Option<Regex>, host: bool) -> Self {
        Self {
            key,
            label,
            regexp,
            statics: Vec::new(),
            params: Vec::new(),
            wildcards: Vec::new(),
            route: None,
            host,
        }
    }

    /// A method root. Roots carry no key and are never merged or removed
    /// by the mutation path.
    pub(crate) fn root() -> Self {
        Self::empty(String::new(), 0, None, false)
    }

    pub(crate) fn new_static(key: String, host: bool) -> Self {
        let label = key.as_bytes().first().copied().unwrap_or(0);
        Self::empty(key, label, None, host)
    }

    pub(crate) fn new_param(key: String, regexp: Option<Regex>, host: bool) -> Self {
        Self::empty(key, 0, regexp, host)
    }

    pub(crate) fn new_wildcard(key: String, regexp: Option<Regex>) -> Self {
        Self::empty(key, 0, regexp, false)
    }

    /// The byte this node sorts under in its parent's static list.
    pub(crate) fn sort_label(&self) -> u8 {
        if self.host {
            self.label.to_ascii_lowercase()
        } else {
            self.label
        }
    }

    /// Binary-searches the static children. Callers in the host region
    /// pass an already lowercased byte.
    pub(crate) fn find_static(&self, label: u8) -> Option<&Arc<Node<T>>> {
        self.static_position(label).ok().map(|i| &self.statics[i])
    }

    pub(crate) fn static_position(&self, label: u8) -> Result<usize, usize> {
        self.statics
            .binary_search_by(|child| child.sort_label().cmp(&label))
    }

    /// Inserts or replaces the static child sharing `child`'s label,
    /// keeping the list sorted.
    pub(crate) fn set_static(&mut self, child: Arc<Node<T>>) {
        match self.static_position(child.sort_label()) {
            Ok(i) => self.statics[i] = child,
            Err(i) => self.statics.insert(i, child),
        }
    }

    pub(crate) fn remove_static(&mut self, label: u8) {
        if let Ok(i) = self.static_position(label) {
            self.statics.remove(i);
        }
    }

    /// Adds a parameter edge, keeping the plain `"?"` edge last.
    pub(crate) fn add_param(&mut self, child: Arc<Node<T>>) {
        push_keeping_placeholder_last(&mut self.params, child, "?");
    }

    /// Adds a wildcard edge, keeping the plain `"*"` edge last.
    pub(crate) fn add_wildcard(&mut self, child: Arc<Node<T>>) {
        push_keeping_placeholder_last(&mut self.wildcards, child, "*");
    }

    /// True when this edge's gate accepts `text` (ungated edges accept
    /// everything).
    pub(crate) fn gate_matches(&self, text: &str) -> bool {
        self.regexp.as_ref().is_none_or(|re| re.is_match(text))
    }
}

fn push_keeping_placeholder_last<T>(
    list: &mut Vec<Arc<Node<T>>>,
    child: Arc<Node<T>>,
    placeholder: &str,
) {
    if child.key == placeholder {
        list.push(child);
        return;
    }
    let at = if list.last().is_some_and(|c| c.key == placeholder) {
        list.len() - 1
    } else {
        list.len()
    };
    list.insert(at, child);
}

/// The main router structure.
///
/// Many readers, one serialized writer: lookups load the published table
/// with a single atomic acquire and never block; registration serializes
/// through the write mutex, rebuilds the affected spine copy-on-write and
/// publishes a new table with one release store.
pub struct Router<T> {
    pub(crate) table: ArcSwap<MethodTable<T>>,
    pub(crate) write: Mutex<()>,
    pub(crate) pool: ContextPool,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Constructs a new, empty `Router`.
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(MethodTable::default()),
            write: Mutex::new(()),
            pool: ContextPool::default(),
        }
    }

    /// Pins the currently published version of the tree.
    ///
    /// Lookups through the snapshot answer exactly as the tree stood at
    /// this call, no matter how many writes are published afterwards.
    pub fn snapshot(&self) -> Snapshot<'_, T> {
        Snapshot {
            table: self.table.load_full(),
            router: self,
        }
    }

    /// Atomically installs `table` as the published version.
    pub(crate) fn publish(&self, table: MethodTable<T>) {
        self.table.store(Arc::new(table));
    }
}

/// An immutable, pinned version of the router's tree.
pub struct Snapshot<'r, T> {
    pub(crate) table: Arc<MethodTable<T>>,
    pub(crate) router: &'r Router<T>,
}

impl<'r, T> Snapshot<'r, T> {
    /// Looks up `(method, hostport, path)` against this pinned version.
    /// Same contract as [`find_route`](crate::find_route).
    pub fn find_route(
        &self,
        method: &str,
        hostport: &str,
        path: &str,
    ) -> Option<MatchedRoute<'r, T>> {
        find_in(self.router, &self.table, method, hostport, path)
    }
}

/// Reusable capture buffers for one lookup.
///
/// `params` holds the captures of the path currently being committed;
/// `tsr_params` holds the parallel snapshot taken when a trailing-slash
/// salvage candidate is recorded.
#[derive(Default)]
pub(crate) struct LookupContext {
    pub(crate) params: Vec<String>,
    pub(crate) tsr_params: Vec<String>,
}

impl LookupContext {
    pub(crate) fn captures(&self, tsr: bool) -> &[String] {
        if tsr { &self.tsr_params } else { &self.params }
    }
}

/// Pool of lookup contexts, keyed to one router. Buffers are truncated on
/// release, not freed, so steady-state lookups allocate only for the
/// captured text itself.
#[derive(Default)]
pub(crate) struct ContextPool {
    slots: Mutex<Vec<LookupContext>>,
}

impl ContextPool {
    pub(crate) fn acquire(&self) -> PooledContext<'_> {
        let ctx = self.slots.lock().pop().unwrap_or_default();
        PooledContext { pool: self, ctx }
    }

    fn release(&self, mut ctx: LookupContext) {
        ctx.params.clear();
        ctx.tsr_params.clear();
        self.slots.lock().push(ctx);
    }
}

/// A pooled [`LookupContext`]: returns itself to the pool on drop, which
/// also covers unwinding out of a lookup.
pub(crate) struct PooledContext<'r> {
    pool: &'r ContextPool,
    pub(crate) ctx: LookupContext,
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_node(key: &str, host: bool) -> Arc<Node<()>> {
        Arc::new(Node::new_static(key.to_string(), host))
    }

    #[test]
    fn test_statics_stay_sorted() {
        let mut node = Node::<()>::root();
        for key in ["zoo", "bar", "mid"] {
            node.set_static(static_node(key, false));
        }
        let labels: Vec<u8> = node.statics.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec![b'b', b'm', b'z']);
        assert!(node.find_static(b'm').is_some());
        assert!(node.find_static(b'q').is_none());

        node.remove_static(b'm');
        assert!(node.find_static(b'm').is_none());
        assert_eq!(node.statics.len(), 2);
    }

    #[test]
    fn test_host_statics_order_case_insensitively() {
        let mut node = Node::<()>::root();
        node.set_static(static_node("API.example.com", true));
        node.set_static(static_node("/path", false));
        // Lookup goes through the lowercased byte.
        assert!(node.find_static(b'a').is_some());
        assert!(node.find_static(b'/').is_some());
    }

    #[test]
    fn test_plain_param_stays_last() {
        let mut node = Node::<()>::root();
        node.add_param(Arc::new(Node::new_param("?".into(), None, false)));
        node.add_param(Arc::new(Node::new_param(r"^\d+$".into(), None, false)));
        node.add_param(Arc::new(Node::new_param("[a-z]+".into(), None, false)));
        let keys: Vec<&str> = node.params.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec![r"^\d+$", "[a-z]+", "?"]);
    }

    #[test]
    fn test_plain_wildcard_stays_last() {
        let mut node = Node::<()>::root();
        node.add_wildcard(Arc::new(Node::new_wildcard("*".into(), None)));
        node.add_wildcard(Arc::new(Node::new_wildcard("[a-z/]+".into(), None)));
        let keys: Vec<&str> = node.wildcards.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["[a-z/]+", "*"]);
    }

    #[test]
    fn test_pool_recycles_contexts() {
        let pool = ContextPool::default();
        {
            let mut ctx = pool.acquire();
            ctx.ctx.params.push("captured".to_string());
        }
        let ctx = pool.acquire();
        assert!(ctx.ctx.params.is_empty());
        assert!(ctx.ctx.tsr_params.is_empty());
    }
}
