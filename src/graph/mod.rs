//! The call-graph store: a per-thread tree of labeled nodes.
//!
//! One `CallGraph` belongs to exactly one OS thread: it is never
//! shared, so none of its methods take locks. Cross-thread access only
//! happens through the aggregator, after the owning thread has quiesced.

mod node;

pub use node::{Node, NodeId};
use node::ChildKey;

use crate::component::Component;
use crate::registry::Hash64;

/// The policy determining how repeated labels attach to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScopeMode {
    /// Re-entering the same label under the same parent reuses the node,
    /// accumulating `laps`. Recursion (different parent depth) creates
    /// children as usual.
    Tree,
    /// All regions attach at depth 1, regardless of nesting.
    Flat,
    /// Every entry creates a fresh node under the current cursor; nodes are
    /// never reused. Produces unbounded growth under hot loops -- use
    /// only for short, bounded traces.
    Timeline,
}

/// The `(parent_tid, hash_path)` recorded when a worker thread is created,
/// used by the aggregator to stitch the worker's tree under the parent's
/// cursor at merge time.
#[derive(Clone, Debug, Default)]
pub struct Bookmark {
    pub parent_tid: Option<u64>,
    pub parent_hash_path: Vec<Hash64>,
}

/// The outcome of [`CallGraph::insert`]: the token a matching
/// [`CallGraph::pop`] must be given.
///
/// `None` means the insertion was skipped (depth exceeded, or the store is
/// disabled) -- the cursor did not move, and `pop` must likewise be a
/// no-op for this token.
#[derive(Clone, Copy, Debug)]
pub struct InsertToken(pub(crate) Option<NodeId>);

/// Per-thread tree of `Node`s plus a cursor identifying where the next
/// insertion attaches.
pub struct CallGraph {
    tid: u64,
    nodes: Vec<Node>,
    root: NodeId,
    cursor: NodeId,
    enabled: bool,
    max_depth: usize,
    sequence: u64,
    bookmark: Bookmark,
}

impl CallGraph {
    /// Creates a new store with a lazily-materialized root for `tid`.
    pub fn new(tid: u64, bookmark: Bookmark) -> Self {
        let root = Node {
            hash: 0,
            depth: 0,
            parent: None,
            children: Vec::new(),
            data: Box::new(crate::component::WallClock::default()),
            open_count: 0,
            is_transient: false,
            tid_of_creation: tid,
        };
        CallGraph {
            tid,
            nodes: vec![root],
            root: NodeId(0),
            cursor: NodeId(0),
            enabled: true,
            max_depth: usize::MAX,
            sequence: 0,
            bookmark,
        }
    }

    pub fn tid(&self) -> u64 {
        self.tid
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn bookmark(&self) -> &Bookmark {
        &self.bookmark
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggles whether `insert`/`pop` do anything at all.
    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Further insertions at depth `> n` are dropped until reset.
    pub fn set_max_depth(&mut self, n: usize) {
        self.max_depth = n;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        // Excludes the implicit root, which is bookkeeping rather than a
        // measured region (the design's node counts in are over
        // measured regions).
        self.nodes.len() - 1
    }

    /// The hash path from the root down to (and including) `id`, used by
    /// the aggregator to locate the matching node in the master tree.
    pub fn hash_path(&self, id: NodeId) -> Vec<Hash64> {
        let mut path = Vec::new();
        let mut cur = Some(id);
        while let Some(node_id) = cur {
            if node_id == self.root {
                break;
            }
            let node = &self.nodes[node_id.0];
            path.push(node.hash);
            cur = node.parent;
        }
        path.reverse();
        path
    }

    /// Navigates from the current cursor according to `scope`, creating a
    /// node if necessary via `make_component`.
    ///
    /// Returns a token to be handed back to [`CallGraph::pop`]. If
    /// insertion is skipped (disabled store, or depth exceeded), the
    /// returned token is a no-op and the cursor does not move.
    pub fn insert(
        &mut self,
        hash: Hash64,
        scope: ScopeMode,
        make_component: impl FnOnce() -> Box<dyn Component>,
    ) -> InsertToken {
        if !self.enabled {
            return InsertToken(None);
        }

        let parent = match scope {
            ScopeMode::Flat => self.root,
            ScopeMode::Tree | ScopeMode::Timeline => self.cursor,
        };
        let child_depth = self.nodes[parent.0].depth + 1;
        if child_depth > self.max_depth {
            log::trace!(
                "call-graph: insert at depth {child_depth} exceeds max_depth {}, skipping",
                self.max_depth
            );
            return InsertToken(None);
        }

        let key = match scope {
            ScopeMode::Tree | ScopeMode::Flat => ChildKey { hash, sequence: None },
            ScopeMode::Timeline => {
                self.sequence += 1;
                ChildKey {
                    hash,
                    sequence: Some(self.sequence),
                }
            }
        };

        let existing = if matches!(scope, ScopeMode::Timeline) {
            None
        } else {
            self.nodes[parent.0]
                .children
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, id)| *id)
        };

        let node_id = match existing {
            Some(id) => id,
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(Node {
                    hash,
                    depth: child_depth,
                    parent: Some(parent),
                    children: Vec::new(),
                    data: make_component(),
                    open_count: 0,
                    is_transient: false,
                    tid_of_creation: self.tid,
                });
                self.nodes[parent.0].children.push((key, id));
                id
            }
        };

        self.nodes[node_id.0].open_count += 1;
        if !matches!(scope, ScopeMode::Flat) {
            self.cursor = node_id;
        } else {
            // FLAT nodes always hang off the root; the cursor still moves
            // there so a subsequent non-FLAT insert nests under it.
            self.cursor = node_id;
        }

        InsertToken(Some(node_id))
    }

    /// Moves the cursor back to the parent of the node named by `token`,
    /// clearing `is_on_stack` once the last referencing handle has closed.
    /// A `token` produced by a skipped `insert` makes this a no-op.
    pub fn pop(&mut self, token: InsertToken) {
        let Some(node_id) = token.0 else {
            return;
        };
        let node = &mut self.nodes[node_id.0];
        if node.open_count == 0 {
            log::debug!("call-graph: pop() without a matching insert(), ignoring");
            return;
        }
        node.open_count -= 1;
        let parent = node.parent;
        if let Some(parent) = parent {
            self.cursor = parent;
        } else {
            self.cursor = self.root;
        }
    }

    /// Closes every node still `is_on_stack`, in LIFO (deepest-first) order,
    /// calling `stop` on each. Used by the aggregator under
    /// `stack_clearing` when `finalize` runs with handles still
    /// open.
    pub fn close_live_handles(&mut self) {
        let mut open: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .skip(1) // root is never "open"
            .filter(|(_, n)| n.open_count > 0)
            .map(|(i, _)| NodeId(i))
            .collect();
        // Deepest nodes first: in a well-formed stack, depth is a total
        // order consistent with LIFO closing.
        open.sort_by(|a, b| self.nodes[b.0].depth.cmp(&self.nodes[a.0].depth));
        for id in open {
            let node = &mut self.nodes[id.0];
            if node.data.is_running() {
                node.data.stop();
            }
            node.open_count = 0;
        }
        self.cursor = self.root;
    }

    /// Depth-first pre-order over the whole tree starting at `root`,
    /// excluding the root itself, calling `visit(node_id, node)` for each.
    pub fn walk(&self, mut visit: impl FnMut(NodeId, &Node)) {
        self.walk_from(self.root, &mut visit);
    }

    fn walk_from(&self, id: NodeId, visit: &mut impl FnMut(NodeId, &Node)) {
        let node = &self.nodes[id.0];
        for (_, child_id) in &node.children {
            visit(*child_id, &self.nodes[child_id.0]);
            self.walk_from(*child_id, visit);
        }
    }

    /// Finds the existing child of `parent` with `hash` (`TREE`/`FLAT`
    /// lookup semantics, ignoring `TIMELINE` siblings), creating one via
    /// `make_component` if absent. Unlike [`CallGraph::insert`], this does
    /// not move the cursor or touch `open_count`: it is used by the
    /// aggregator to build tree structure that was never "on stack" on
    /// this thread.
    pub fn find_or_create_child(
        &mut self,
        parent: NodeId,
        hash: Hash64,
        make_component: impl FnOnce() -> Box<dyn Component>,
    ) -> NodeId {
        if let Some((_, id)) = self.nodes[parent.0]
            .children
            .iter()
            .find(|(k, _)| k.hash == hash && k.sequence.is_none())
        {
            return *id;
        }
        let depth = self.nodes[parent.0].depth + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            hash,
            depth,
            parent: Some(parent),
            children: Vec::new(),
            data: make_component(),
            open_count: 0,
            is_transient: true,
            tid_of_creation: self.tid,
        });
        self.nodes[parent.0].children.push((ChildKey { hash, sequence: None }, id));
        id
    }

    /// Folds `other` into the component stored at `id`, marking the node
    /// transient (it has now been merged out at least once).
    pub fn merge_component(&mut self, id: NodeId, other: &dyn Component) {
        self.nodes[id.0].data.merge(other);
        self.nodes[id.0].is_transient = true;
    }

    /// Discards all nodes but the root, resetting the cursor. Used by
    /// `clear()`, which preserves Settings and the hash registry.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.cursor = self.root;
        self.sequence = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::WallClock;

    fn make() -> Box<dyn Component> {
        Box::new(WallClock::default())
    }

    #[test]
    fn tree_scope_reuses_node_at_same_parent() {
        let mut g = CallGraph::new(1, Bookmark::default());
        let t1 = g.insert(10, ScopeMode::Tree, make);
        g.pop(t1);
        let t2 = g.insert(10, ScopeMode::Tree, make);
        g.pop(t2);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node(t2.0.unwrap()).laps(), 0); // laps only increase on component stop()
    }

    #[test]
    fn tree_scope_recursion_creates_children() {
        let mut g = CallGraph::new(1, Bookmark::default());
        let outer = g.insert(10, ScopeMode::Tree, make);
        let inner = g.insert(10, ScopeMode::Tree, make); // same label, nested -> child
        assert_ne!(outer.0, inner.0);
        assert_eq!(g.node(inner.0.unwrap()).depth(), 2);
        g.pop(inner);
        g.pop(outer);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn flat_scope_collapses_nesting_to_depth_one() {
        let mut g = CallGraph::new(1, Bookmark::default());
        let outer = g.insert(10, ScopeMode::Flat, make);
        let inner = g.insert(10, ScopeMode::Flat, make);
        assert_eq!(outer.0, inner.0);
        assert_eq!(g.node(inner.0.unwrap()).depth(), 1);
        assert_eq!(g.node(inner.0.unwrap()).open_count, 2);
        g.pop(inner);
        assert_eq!(g.node(outer.0.unwrap()).open_count, 1);
        g.pop(outer);
        assert_eq!(g.node(outer.0.unwrap()).open_count, 0);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn timeline_scope_never_reuses_nodes() {
        let mut g = CallGraph::new(1, Bookmark::default());
        let a = g.insert(10, ScopeMode::Timeline, make);
        g.pop(a);
        let b = g.insert(10, ScopeMode::Timeline, make);
        g.pop(b);
        assert_ne!(a.0, b.0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn depth_limit_skips_insertion_and_pop_is_noop() {
        let mut g = CallGraph::new(1, Bookmark::default());
        g.set_max_depth(1);
        let a = g.insert(10, ScopeMode::Tree, make);
        assert!(a.0.is_some());
        let b = g.insert(20, ScopeMode::Tree, make);
        assert!(b.0.is_none());
        g.pop(b); // no-op
        g.pop(a);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn max_depth_zero_disables_all_storage() {
        let mut g = CallGraph::new(1, Bookmark::default());
        g.set_max_depth(0);
        let a = g.insert(10, ScopeMode::Tree, make);
        assert!(a.0.is_none());
        g.pop(a);
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn disabled_store_is_noop() {
        let mut g = CallGraph::new(1, Bookmark::default());
        g.enable(false);
        let a = g.insert(10, ScopeMode::Tree, make);
        assert!(a.0.is_none());
        g.pop(a);
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn clear_resets_to_empty_tree() {
        let mut g = CallGraph::new(1, Bookmark::default());
        let a = g.insert(10, ScopeMode::Tree, make);
        g.pop(a);
        assert_eq!(g.node_count(), 1);
        g.clear();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.cursor(), g.root());
    }

    #[test]
    fn hash_path_excludes_root() {
        let mut g = CallGraph::new(1, Bookmark::default());
        let outer = g.insert(10, ScopeMode::Tree, make);
        let inner = g.insert(20, ScopeMode::Tree, make);
        assert_eq!(g.hash_path(inner.0.unwrap()), vec![10, 20]);
        g.pop(inner);
        g.pop(outer);
    }
}
