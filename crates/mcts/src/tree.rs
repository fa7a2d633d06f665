//! Arena-allocated search tree.
//!
//! Nodes live in a contiguous vector and are referenced by index, which
//! avoids `Rc<RefCell<_>>` plumbing and keeps clearing cheap. Children
//! are always created after their parent, so a parent's index is
//! strictly below its child's.

use crate::node::{NodeId, StageNode};
use ccmcts_core::Domain;

/// Arena of stage nodes rooted at [`NodeId::ROOT`].
#[derive(Debug)]
pub struct Tree<S: Domain, E, O> {
    nodes: Vec<StageNode<S, E, O>>,
}

impl<S: Domain, E, O> Tree<S, E, O> {
    /// Create a tree from its root node.
    pub fn new(root: StageNode<S, E, O>) -> Self {
        Self { nodes: vec![root] }
    }

    /// Get a reference to a node.
    ///
    /// # Panics
    /// Panics if the id is invalid.
    pub fn get(&self, id: NodeId) -> &StageNode<S, E, O> {
        &self.nodes[id.0]
    }

    /// Get a mutable reference to a node.
    ///
    /// # Panics
    /// Panics if the id is invalid.
    pub fn get_mut(&mut self, id: NodeId) -> &mut StageNode<S, E, O> {
        &mut self.nodes[id.0]
    }

    /// Add a node, returning its id.
    pub fn add(&mut self, node: StageNode<S, E, O>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root exists from construction on.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node.
    pub fn root(&self) -> &StageNode<S, E, O> {
        self.get(NodeId::ROOT)
    }

    /// Mutably borrow a parent together with an immutable borrow of one
    /// of its descendants, as needed during backpropagation.
    ///
    /// # Panics
    /// Panics unless `parent` was created before `child`.
    pub fn parent_child_mut(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> (&mut StageNode<S, E, O>, &StageNode<S, E, O>) {
        assert!(
            parent.0 < child.0,
            "BUG: parent {} must precede child {} in the arena",
            parent.0,
            child.0
        );
        let (left, right) = self.nodes.split_at_mut(child.0);
        (&mut left[parent.0], &right[0])
    }
}
