//! Node storage for data trees.
//!
//! Nodes live in a slot vector and refer to each other by [`NodeId`]. A
//! parent owns the ordered list of its children; the parent handle on a
//! child is navigational only. Removing a subtree unlinks it from its parent
//! and returns every slot it used to the free list.
//!
//! # Invariants
//!
//! - Every live node except a document root has exactly one parent, and
//!   appears exactly once in that parent's child list.
//! - Terminal nodes (leaves and leaf-lists) have no children.
//! - A handle is only dereferenced while its slot is live.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use yangtree_schema::SchemaNode;

/// Stable handle to a node inside one tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One stored node.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    /// `None` only for the document root.
    pub schema: Option<Arc<SchemaNode>>,
    /// Canonical wire string of a leaf or leaf-list member.
    pub value: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn root() -> Self {
        Self {
            schema: None,
            value: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn new(schema: Arc<SchemaNode>, value: Option<String>) -> Self {
        Self {
            schema: Some(schema),
            value,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Whether this node is an instance of `schema`.
    pub fn is_instance_of(&self, schema: &SchemaNode) -> bool {
        self.schema
            .as_deref()
            .map_or(false, |s| std::ptr::eq(s, schema))
    }
}

/// Slot storage with a free list.
#[derive(Clone, Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    live: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Store a detached node.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                NodeId(idx)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Store `node` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = self.insert(node);
        self[parent].children.push(id);
        id
    }

    /// Unlink `id` from its parent and release its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self[id].parent {
            self[parent].children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.slots[current.0].take() {
                stack.extend(node.children);
                self.free.push(current.0);
                self.live -= 1;
            }
        }
    }

    /// Ancestors of `id` from its parent up to the top, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self[id].parent, move |p| self[*p].parent)
    }

    /// `id` and all its descendants, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self[current].children.iter().rev().copied());
        }
        out
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.slots[id.0].as_ref().expect("stale node handle")
    }
}

impl IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.0].as_mut().expect("stale node handle")
    }
}
