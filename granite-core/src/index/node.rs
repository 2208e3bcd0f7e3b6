//! B+ tree node representation
//!
//! Nodes live in an arena owned by the tree and refer to each other through
//! [`NodeId`] handles, including the parent back-reference and the forward
//! leaf sibling chain. Handles are updated on every structural change, so
//! splits and merges never leave a dangling reference.

use crate::RowAddress;

/// Handle into the tree's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(pub usize);

/// Leaf node: keys paired 1:1 with physical addresses, plus the forward
/// sibling link that stitches leaves into key order
#[derive(Debug)]
pub(crate) struct LeafNode {
    pub keys: Vec<i32>,
    pub addrs: Vec<RowAddress>,
    pub next: Option<NodeId>,
    pub parent: Option<NodeId>,
}

impl LeafNode {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            addrs: Vec::new(),
            next: None,
            parent: None,
        }
    }
}

/// Internal node: separator keys between child handles.
/// Invariant: `keys.len() == children.len() - 1`, and `keys[i]` equals the
/// smallest key in the subtree of `children[i + 1]`.
#[derive(Debug)]
pub(crate) struct InternalNode {
    pub keys: Vec<i32>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl InternalNode {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// A tree node, leaf or internal
#[derive(Debug)]
pub(crate) enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::Internal(internal) => internal.parent,
        }
    }

    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::Internal(internal) => internal.parent = parent,
        }
    }

    pub fn key_count(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.keys.len(),
            Node::Internal(internal) => internal.keys.len(),
        }
    }
}
