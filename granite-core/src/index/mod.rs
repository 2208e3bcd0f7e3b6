//! B+ tree index
//!
//! An in-memory ordered multi-way tree mapping a non-unique i32 key to the
//! physical addresses of its records. Nodes live in an arena and reference
//! each other by handle (parent back-references and the forward leaf chain),
//! so splits and merges never risk a dangling pointer.
//!
//! Geometry is threaded at construction: [`BPlusTree::for_block_size`]
//! derives the fan-out from a block size the way the storage layer sizes its
//! blocks, while [`BPlusTree::with_max_keys`] lets tests exercise tiny trees
//! deterministically.

mod node;

use crate::RowAddress;
use node::{InternalNode, LeafNode, Node, NodeId};

/// B+ tree over an arena of nodes
pub struct BPlusTree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
    max_keys: usize,
    min_leaf_keys: usize,
    min_internal_keys: usize,
    height: usize,
    node_count: usize,
    deleted_nodes: usize,
    len: usize,
}

/// Summary counters for reporting
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub max_keys: usize,
    pub height: usize,
    pub node_count: usize,
    pub deleted_nodes: usize,
    pub entries: usize,
    pub root_keys: Vec<i32>,
}

impl BPlusTree {
    /// Create a tree with an explicit fan-out bound
    pub fn with_max_keys(max_keys: usize) -> Self {
        assert!(max_keys >= 2, "a B+ tree needs at least two keys per node");
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            max_keys,
            min_leaf_keys: (max_keys + 1) / 2,
            min_internal_keys: max_keys / 2,
            height: 1,
            node_count: 0,
            deleted_nodes: 0,
            len: 0,
        };
        tree.root = tree.alloc(Node::Leaf(LeafNode::new()));
        tree
    }

    /// Create a tree sized for nodes that fit in `block_size` bytes
    pub fn for_block_size(block_size: usize) -> Self {
        let max_keys = (block_size - crate::config::POINTER_SIZE)
            / (crate::config::KEY_SIZE + crate::config::POINTER_SIZE);
        Self::with_max_keys(max_keys)
    }

    /// Maximum keys per node
    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Tree height (1 for a single-leaf tree)
    pub fn height(&self) -> usize {
        self.height
    }

    /// Live node count
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of key entries in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Summary counters
    pub fn stats(&self) -> TreeStats {
        let root_keys = match self.node(self.root) {
            Node::Leaf(leaf) => leaf.keys.clone(),
            Node::Internal(internal) => internal.keys.clone(),
        };
        TreeStats {
            max_keys: self.max_keys,
            height: self.height,
            node_count: self.node_count,
            deleted_nodes: self.deleted_nodes,
            entries: self.len,
            root_keys,
        }
    }

    // -- arena plumbing ------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        self.node_count += 1;
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.0] = None;
        self.free.push(id.0);
        self.node_count -= 1;
        self.deleted_nodes += 1;
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0].as_ref().expect("stale node handle")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("stale node handle")
    }

    fn leaf(&self, id: NodeId) -> &LeafNode {
        match self.node(id) {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("expected leaf node"),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode {
        match self.node_mut(id) {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("expected leaf node"),
        }
    }

    fn internal(&self, id: NodeId) -> &InternalNode {
        match self.node(id) {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => unreachable!("expected internal node"),
        }
    }

    fn internal_mut(&mut self, id: NodeId) -> &mut InternalNode {
        match self.node_mut(id) {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => unreachable!("expected internal node"),
        }
    }

    /// Smallest key in the subtree rooted at `id`
    fn smallest_key(&self, id: NodeId) -> i32 {
        let mut current = id;
        loop {
            match self.node(current) {
                Node::Internal(internal) => current = internal.children[0],
                Node::Leaf(leaf) => return leaf.keys[0],
            }
        }
    }

    /// Recompute an internal node's separators from its children's smallest
    /// keys
    fn rebuild_keys(&mut self, id: NodeId) {
        let children = self.internal(id).children.clone();
        let keys: Vec<i32> = children[1..]
            .iter()
            .map(|&child| self.smallest_key(child))
            .collect();
        self.internal_mut(id).keys = keys;
    }

    /// Rebuild separators from `start` up to the root
    fn refresh_path(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(id) = current {
            if !self.node(id).is_leaf() {
                self.rebuild_keys(id);
            }
            current = self.node(id).parent();
        }
    }

    fn child_position(&self, parent: NodeId, child: NodeId) -> usize {
        self.internal(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .expect("child not present under its recorded parent")
    }

    /// Descend to a leaf. Insertion follows the rightmost separator <= key
    /// (equal keys go right); lookups go left on an equal separator so a
    /// duplicate run that straddles a split is never skipped.
    fn descend(&self, key: i32, for_insert: bool) -> NodeId {
        let mut current = self.root;
        loop {
            match self.node(current) {
                Node::Leaf(_) => return current,
                Node::Internal(internal) => {
                    let idx = if for_insert {
                        internal.keys.partition_point(|k| *k <= key)
                    } else {
                        internal.keys.partition_point(|k| *k < key)
                    };
                    current = internal.children[idx];
                }
            }
        }
    }

    /// Leftmost leaf of the tree
    fn first_leaf(&self) -> NodeId {
        let mut current = self.root;
        loop {
            match self.node(current) {
                Node::Leaf(_) => return current,
                Node::Internal(internal) => current = internal.children[0],
            }
        }
    }

    /// Leaf whose `next` link points at `id`, if any
    fn chain_predecessor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.first_leaf();
        if current == id {
            return None;
        }
        loop {
            let next = self.leaf(current).next?;
            if next == id {
                return Some(current);
            }
            current = next;
        }
    }

    // -- insertion -----------------------------------------------------------

    /// Insert one key/address entry. Duplicate keys are allowed; among
    /// equals, the new entry lands after the existing ones.
    pub fn insert(&mut self, key: i32, addr: RowAddress) {
        let leaf_id = self.descend(key, true);
        if self.node(leaf_id).key_count() < self.max_keys {
            let leaf = self.leaf_mut(leaf_id);
            let pos = leaf.keys.partition_point(|k| *k <= key);
            leaf.keys.insert(pos, key);
            leaf.addrs.insert(pos, addr);
            self.len += 1;
        } else {
            self.split_leaf(leaf_id, key, addr);
        }
    }

    fn split_leaf(&mut self, leaf_id: NodeId, key: i32, addr: RowAddress) {
        let (mut keys, mut addrs, old_next, parent) = {
            let leaf = self.leaf_mut(leaf_id);
            (
                std::mem::take(&mut leaf.keys),
                std::mem::take(&mut leaf.addrs),
                leaf.next,
                leaf.parent,
            )
        };

        let pos = keys.partition_point(|k| *k <= key);
        keys.insert(pos, key);
        addrs.insert(pos, addr);

        let right_keys = keys.split_off(self.min_leaf_keys);
        let right_addrs = addrs.split_off(self.min_leaf_keys);

        let new_id = self.alloc(Node::Leaf(LeafNode {
            keys: right_keys,
            addrs: right_addrs,
            next: old_next,
            parent,
        }));

        let leaf = self.leaf_mut(leaf_id);
        leaf.keys = keys;
        leaf.addrs = addrs;
        leaf.next = Some(new_id);

        self.len += 1;
        self.insert_into_parent(leaf_id, new_id);
    }

    /// Hook `right_id` in as the sibling immediately after `left_id`,
    /// splitting upward as long as parents overflow
    fn insert_into_parent(&mut self, left_id: NodeId, right_id: NodeId) {
        match self.node(left_id).parent() {
            None => {
                // left was the root: grow a level
                let new_root = self.alloc(Node::Internal(InternalNode {
                    keys: vec![self.smallest_key(right_id)],
                    children: vec![left_id, right_id],
                    parent: None,
                }));
                self.node_mut(left_id).set_parent(Some(new_root));
                self.node_mut(right_id).set_parent(Some(new_root));
                self.root = new_root;
                self.height += 1;
            }
            Some(parent_id) => {
                let pos = self.child_position(parent_id, left_id) + 1;
                if self.node(parent_id).key_count() < self.max_keys {
                    self.internal_mut(parent_id).children.insert(pos, right_id);
                    self.node_mut(right_id).set_parent(Some(parent_id));
                    self.rebuild_keys(parent_id);
                } else {
                    self.split_internal(parent_id, pos, right_id);
                }
            }
        }
    }

    fn split_internal(&mut self, node_id: NodeId, pos: usize, new_child: NodeId) {
        let (mut children, parent) = {
            let internal = self.internal_mut(node_id);
            (std::mem::take(&mut internal.children), internal.parent)
        };
        children.insert(pos, new_child);

        let right_children = children.split_off(self.min_internal_keys + 1);

        let new_id = self.alloc(Node::Internal(InternalNode {
            keys: Vec::new(),
            children: Vec::new(),
            parent,
        }));
        for &child in &children {
            self.node_mut(child).set_parent(Some(node_id));
        }
        for &child in &right_children {
            self.node_mut(child).set_parent(Some(new_id));
        }

        self.internal_mut(node_id).children = children;
        self.internal_mut(new_id).children = right_children;
        self.rebuild_keys(node_id);
        self.rebuild_keys(new_id);

        self.insert_into_parent(node_id, new_id);
    }

    // -- lookup --------------------------------------------------------------

    /// All addresses stored under `key`, in insertion order among duplicates
    pub fn find(&self, key: i32) -> Vec<RowAddress> {
        let mut result = Vec::new();
        let mut current = Some(self.descend(key, false));
        while let Some(id) = current {
            let leaf = self.leaf(id);
            for (i, &k) in leaf.keys.iter().enumerate() {
                if k == key {
                    result.push(leaf.addrs[i]);
                } else if k > key {
                    return result;
                }
            }
            current = leaf.next;
        }
        result
    }

    /// All addresses with key in `[min, max]`, in leaf-chain order
    pub fn find_range(&self, min: i32, max: i32) -> Vec<RowAddress> {
        let mut result = Vec::new();
        if min > max {
            return result;
        }
        let mut current = Some(self.descend(min, false));
        while let Some(id) = current {
            let leaf = self.leaf(id);
            for (i, &k) in leaf.keys.iter().enumerate() {
                if k > max {
                    return result;
                }
                if k >= min {
                    result.push(leaf.addrs[i]);
                }
            }
            current = leaf.next;
        }
        result
    }

    // -- deletion ------------------------------------------------------------

    /// Remove the first occurrence of `key`, returning its address.
    /// Absent keys are a no-op returning `None`.
    pub fn remove_one(&mut self, key: i32) -> Option<RowAddress> {
        let mut current = Some(self.descend(key, false));
        let (leaf_id, pos) = loop {
            let id = current?;
            let leaf = self.leaf(id);
            if let Some(pos) = leaf.keys.iter().position(|&k| k == key) {
                break (id, pos);
            }
            if leaf.keys.last().map_or(false, |&k| k > key) {
                return None;
            }
            current = leaf.next;
        };

        let leaf = self.leaf_mut(leaf_id);
        leaf.keys.remove(pos);
        let addr = leaf.addrs.remove(pos);
        self.len -= 1;

        if leaf_id == self.root {
            return Some(addr);
        }
        if self.node(leaf_id).key_count() < self.min_leaf_keys {
            self.rebalance_leaf(leaf_id);
        } else {
            let parent = self.node(leaf_id).parent().expect("non-root leaf has a parent");
            self.refresh_path(parent);
        }
        Some(addr)
    }

    /// Remove every occurrence of `key`, one entry at a time, returning the
    /// number removed
    pub fn remove_all(&mut self, key: i32) -> usize {
        let mut removed = 0;
        while self.remove_one(key).is_some() {
            removed += 1;
        }
        removed
    }

    fn rebalance_leaf(&mut self, id: NodeId) {
        let parent_id = self.node(id).parent().expect("non-root leaf has a parent");
        let pos = self.child_position(parent_id, id);
        let left_id = (pos > 0).then(|| self.internal(parent_id).children[pos - 1]);
        let right_id = self.internal(parent_id).children.get(pos + 1).copied();

        let needed = self.min_leaf_keys - self.node(id).key_count();
        let left_spare = left_id
            .map_or(0, |l| self.node(l).key_count().saturating_sub(self.min_leaf_keys));
        let right_spare = right_id
            .map_or(0, |r| self.node(r).key_count().saturating_sub(self.min_leaf_keys));

        if needed <= left_spare + right_spare {
            // borrow: left sibling's tail entries first, then the right
            // sibling's head entries
            let from_left = needed.min(left_spare);
            if from_left > 0 {
                let l = left_id.expect("left spare capacity implies a left sibling");
                for _ in 0..from_left {
                    let (k, a) = {
                        let left = self.leaf_mut(l);
                        (left.keys.pop().unwrap(), left.addrs.pop().unwrap())
                    };
                    let leaf = self.leaf_mut(id);
                    leaf.keys.insert(0, k);
                    leaf.addrs.insert(0, a);
                }
            }
            if let Some(r) = right_id.filter(|_| needed > from_left) {
                for _ in 0..(needed - from_left) {
                    let (k, a) = {
                        let right = self.leaf_mut(r);
                        (right.keys.remove(0), right.addrs.remove(0))
                    };
                    let leaf = self.leaf_mut(id);
                    leaf.keys.push(k);
                    leaf.addrs.push(a);
                }
            }
            self.refresh_path(parent_id);
        } else {
            // merge the node into a neighbour and recurse the underflow
            // check upward
            let (keys, addrs, next) = {
                let leaf = self.leaf_mut(id);
                (
                    std::mem::take(&mut leaf.keys),
                    std::mem::take(&mut leaf.addrs),
                    leaf.next.take(),
                )
            };
            if let Some(l) = left_id {
                // the left sibling is also the chain predecessor
                let left = self.leaf_mut(l);
                left.keys.extend(keys);
                left.addrs.extend(addrs);
                left.next = next;
            } else {
                let r = right_id.expect("a non-root leaf has at least one sibling");
                let right = self.leaf_mut(r);
                right.keys.splice(0..0, keys);
                right.addrs.splice(0..0, addrs);
                if let Some(pred) = self.chain_predecessor(id) {
                    self.leaf_mut(pred).next = next;
                }
            }
            let detach_at = self.child_position(parent_id, id);
            self.internal_mut(parent_id).children.remove(detach_at);
            self.release(id);
            self.rebalance_internal(parent_id);
        }
    }

    fn rebalance_internal(&mut self, id: NodeId) {
        self.rebuild_keys(id);

        if id == self.root {
            // a root with a single child hands the root over to it
            if self.internal(id).children.len() == 1 {
                let child = self.internal(id).children[0];
                self.node_mut(child).set_parent(None);
                self.release(id);
                self.root = child;
                self.height -= 1;
            }
            return;
        }

        let parent_id = self.node(id).parent().expect("non-root node has a parent");
        let min_children = self.min_internal_keys + 1;
        if self.internal(id).children.len() >= min_children {
            self.refresh_path(parent_id);
            return;
        }

        let pos = self.child_position(parent_id, id);
        let left_id = (pos > 0).then(|| self.internal(parent_id).children[pos - 1]);
        let right_id = self.internal(parent_id).children.get(pos + 1).copied();

        let needed = min_children - self.internal(id).children.len();
        let left_spare = left_id
            .map_or(0, |l| self.internal(l).children.len().saturating_sub(min_children));
        let right_spare = right_id
            .map_or(0, |r| self.internal(r).children.len().saturating_sub(min_children));

        if needed <= left_spare + right_spare {
            let from_left = needed.min(left_spare);
            if from_left > 0 {
                let l = left_id.expect("left spare capacity implies a left sibling");
                for _ in 0..from_left {
                    let child = self.internal_mut(l).children.pop().unwrap();
                    self.node_mut(child).set_parent(Some(id));
                    self.internal_mut(id).children.insert(0, child);
                }
                self.rebuild_keys(l);
            }
            if let Some(r) = right_id.filter(|_| needed > from_left) {
                for _ in 0..(needed - from_left) {
                    let child = self.internal_mut(r).children.remove(0);
                    self.node_mut(child).set_parent(Some(id));
                    self.internal_mut(id).children.push(child);
                }
                self.rebuild_keys(r);
            }
            self.rebuild_keys(id);
            self.refresh_path(parent_id);
        } else {
            let children = std::mem::take(&mut self.internal_mut(id).children);
            if let Some(l) = left_id {
                for &child in &children {
                    self.node_mut(child).set_parent(Some(l));
                }
                self.internal_mut(l).children.extend(children);
                self.rebuild_keys(l);
            } else {
                let r = right_id.expect("a non-root node has at least one sibling");
                for &child in &children {
                    self.node_mut(child).set_parent(Some(r));
                }
                self.internal_mut(r).children.splice(0..0, children);
                self.rebuild_keys(r);
            }
            let detach_at = self.child_position(parent_id, id);
            self.internal_mut(parent_id).children.remove(detach_at);
            self.release(id);
            self.rebalance_internal(parent_id);
        }
    }
}

#[cfg(test)]
impl BPlusTree {
    /// Walk the whole structure asserting the balance invariants:
    /// equal leaf depth, occupancy bounds, separator ordering, parent
    /// handles, and a globally non-decreasing leaf chain.
    fn validate(&self) {
        let mut leaf_depth: Option<usize> = None;
        let mut leaves_in_order = Vec::new();
        self.validate_node(self.root, 1, &mut leaf_depth, &mut leaves_in_order);

        // the chain must visit the same leaves, left to right
        let mut chained = Vec::new();
        let mut current = Some(self.first_leaf());
        while let Some(id) = current {
            chained.push(id);
            current = self.leaf(id).next;
        }
        assert_eq!(chained, leaves_in_order, "leaf chain out of order");

        let all_keys: Vec<i32> = chained
            .iter()
            .flat_map(|&id| self.leaf(id).keys.clone())
            .collect();
        assert!(
            all_keys.windows(2).all(|w| w[0] <= w[1]),
            "leaf chain keys not non-decreasing"
        );
        assert_eq!(all_keys.len(), self.len, "entry count out of sync");
        assert_eq!(leaf_depth.unwrap_or(1), self.height, "height out of sync");
    }

    fn validate_node(
        &self,
        id: NodeId,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
    ) -> (i32, i32) {
        match self.node(id) {
            Node::Leaf(leaf) => {
                match *leaf_depth {
                    Some(d) => assert_eq!(d, depth, "leaves at unequal depth"),
                    None => *leaf_depth = Some(depth),
                }
                if id != self.root {
                    assert!(leaf.keys.len() >= self.min_leaf_keys, "leaf underflow");
                }
                assert!(leaf.keys.len() <= self.max_keys, "leaf overflow");
                assert_eq!(leaf.keys.len(), leaf.addrs.len());
                assert!(leaf.keys.windows(2).all(|w| w[0] <= w[1]));
                leaves.push(id);
                (
                    *leaf.keys.first().unwrap_or(&i32::MAX),
                    *leaf.keys.last().unwrap_or(&i32::MIN),
                )
            }
            Node::Internal(internal) => {
                assert_eq!(internal.keys.len() + 1, internal.children.len());
                if id != self.root {
                    assert!(
                        internal.keys.len() >= self.min_internal_keys,
                        "internal underflow"
                    );
                }
                assert!(internal.keys.len() <= self.max_keys, "internal overflow");

                let mut min = i32::MAX;
                let mut max = i32::MIN;
                for (i, &child) in internal.children.iter().enumerate() {
                    assert_eq!(self.node(child).parent(), Some(id), "bad parent handle");
                    let (child_min, child_max) =
                        self.validate_node(child, depth + 1, leaf_depth, leaves);
                    if i > 0 {
                        assert!(
                            internal.keys[i - 1] <= child_min,
                            "separator above right subtree"
                        );
                    }
                    if i < internal.keys.len() {
                        assert!(
                            child_max <= internal.keys[i],
                            "separator below left subtree"
                        );
                    }
                    min = min.min(child_min);
                    max = max.max(child_max);
                }
                (min, max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn addr(n: usize) -> RowAddress {
        RowAddress::new(n / 9 + 1, n % 9)
    }

    #[test]
    fn test_first_split_grows_a_level() {
        // max_keys = 2: the third insert forces a split
        let mut tree = BPlusTree::with_max_keys(2);
        tree.insert(5, addr(0));
        tree.insert(10, addr(1));
        assert_eq!(tree.height(), 1);

        tree.insert(15, addr(2));
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.node_count(), 3);

        assert_eq!(tree.find(10), vec![addr(1)]);
        assert_eq!(tree.find(20), Vec::<RowAddress>::new());
        tree.validate();
    }

    #[test]
    fn test_sequential_inserts_stay_balanced() {
        let mut tree = BPlusTree::with_max_keys(3);
        for i in 0..200 {
            tree.insert(i, addr(i as usize));
        }
        tree.validate();
        assert_eq!(tree.len(), 200);
        for i in 0..200 {
            assert_eq!(tree.find(i), vec![addr(i as usize)]);
        }
    }

    #[test]
    fn test_duplicates_preserve_insertion_order() {
        let mut tree = BPlusTree::with_max_keys(2);
        for i in 0..8 {
            tree.insert(7, addr(i));
        }
        tree.validate();
        let found = tree.find(7);
        assert_eq!(found, (0..8).map(addr).collect::<Vec<_>>());
    }

    #[test]
    fn test_duplicate_run_straddling_a_split_is_found() {
        // pack duplicates around distinct keys so a run is forced to span
        // leaves on both sides of a promoted separator
        let mut tree = BPlusTree::with_max_keys(2);
        for i in 0..4 {
            tree.insert(10, addr(i));
        }
        tree.insert(5, addr(100));
        tree.insert(15, addr(101));
        tree.validate();
        assert_eq!(tree.find(10).len(), 4);
    }

    #[test]
    fn test_range_lookup() {
        let mut tree = BPlusTree::with_max_keys(3);
        for i in 0..100 {
            tree.insert(i % 10, addr(i as usize));
        }
        tree.validate();
        // 10 entries per distinct key; 3 keys in range
        assert_eq!(tree.find_range(3, 5).len(), 30);
        assert_eq!(tree.find_range(20, 30).len(), 0);
        assert_eq!(tree.find_range(5, 3).len(), 0);
    }

    #[test]
    fn test_remove_one_and_all() {
        let mut tree = BPlusTree::with_max_keys(3);
        for i in 0..5 {
            tree.insert(42, addr(i));
        }
        tree.insert(1, addr(10));

        assert_eq!(tree.remove_one(42), Some(addr(0)));
        assert_eq!(tree.find(42).len(), 4);

        assert_eq!(tree.remove_all(42), 4);
        assert!(tree.find(42).is_empty());
        assert_eq!(tree.find(1), vec![addr(10)]);
        tree.validate();
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut tree = BPlusTree::with_max_keys(3);
        tree.insert(1, addr(0));
        assert_eq!(tree.remove_one(99), None);
        assert_eq!(tree.remove_all(99), 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_root_collapse_on_delete() {
        let mut tree = BPlusTree::with_max_keys(2);
        for i in 0..10 {
            tree.insert(i, addr(i as usize));
        }
        assert!(tree.height() > 2);

        for i in 0..9 {
            tree.remove_one(i);
            tree.validate();
        }
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.find(9), vec![addr(9)]);
    }

    #[test]
    fn test_delete_to_empty_and_reuse() {
        let mut tree = BPlusTree::with_max_keys(2);
        for i in 0..20 {
            tree.insert(i, addr(i as usize));
        }
        for i in 0..20 {
            assert!(tree.remove_one(i).is_some());
            tree.validate();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);

        // freed arena slots are reused
        tree.insert(3, addr(0));
        tree.insert(4, addr(1));
        tree.validate();
        assert_eq!(tree.find(3), vec![addr(0)]);
    }

    #[test]
    fn test_randomized_inserts_and_deletes_hold_invariants() {
        let mut rng = StdRng::seed_from_u64(0xB71);
        for &max_keys in &[2usize, 3, 4, 7] {
            let mut tree = BPlusTree::with_max_keys(max_keys);
            let mut live: Vec<i32> = Vec::new();

            for i in 0..500 {
                let key = rng.gen_range(0..60);
                tree.insert(key, addr(i));
                live.push(key);
            }
            tree.validate();

            live.shuffle(&mut rng);
            for (i, key) in live.into_iter().enumerate() {
                assert!(tree.remove_one(key).is_some());
                if i % 37 == 0 {
                    tree.validate();
                }
            }
            tree.validate();
            assert!(tree.is_empty());
        }
    }
}
