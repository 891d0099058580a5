use crate::component::Component;
use crate::registry::Hash64;

/// Index of a [`Node`] within a [`CallGraph`][super::CallGraph]'s arena.
///
/// Nodes reference parents and children by index rather than by owning
/// pointer, so the tree has no back-owning relations: the arena owns
/// every node, and a `NodeId` is just a relation into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(super) usize);

/// The key a child is stored under in its parent's `children` list.
///
/// `TREE` and `FLAT` children are looked up by hash alone (`sequence ==
/// None`); `TIMELINE` children additionally carry a per-insertion sequence
/// number so repeated entries never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) struct ChildKey {
    pub hash: Hash64,
    pub sequence: Option<u64>,
}

/// One labeled region in a per-thread call-graph.
pub struct Node {
    pub(super) hash: Hash64,
    pub(super) depth: usize,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<(ChildKey, NodeId)>,
    pub(super) data: Box<dyn Component>,
    /// Number of scoped handles currently resolved to this node, across the
    /// whole call stack below it (not just directly). Reference-counted so
    /// `FLAT` scope, where recursive re-entry collapses onto one node, knows
    /// when the last handle has closed.
    pub(super) open_count: u32,
    /// Set once this node has been folded into a master tree by the
    /// aggregator; it may still be re-entered afterwards.
    pub(super) is_transient: bool,
    /// Thread id that created this node, used only for reporting.
    pub(super) tid_of_creation: u64,
}

impl Node {
    pub fn hash(&self) -> Hash64 {
        self.hash
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|(_, id)| *id)
    }

    pub fn data(&self) -> &dyn Component {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> &mut dyn Component {
        self.data.as_mut()
    }

    pub fn laps(&self) -> u64 {
        self.data.laps()
    }

    pub fn is_on_stack(&self) -> bool {
        self.open_count > 0
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn tid_of_creation(&self) -> u64 {
        self.tid_of_creation
    }
}
