//! Borrowed views of tree nodes.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use yangtree_schema::SchemaNode;
use yangtree_types::{decode, NodeKind, Value};

use crate::arena::NodeId;
use crate::tree::DataTree;

/// One node of a [`DataTree`], with its value decoded at construction.
///
/// Containers, list entries and the document root carry the presence
/// marker `Bool(true)`. The document root has no schema and displays as
/// `/`.
#[derive(Clone)]
pub struct DataNode<'t> {
    tree: &'t DataTree,
    id: NodeId,
    value: Value,
}

impl<'t> DataNode<'t> {
    pub(crate) fn new(tree: &'t DataTree, id: NodeId) -> Self {
        let node = &tree.arena[id];
        let wire = node.value.as_deref().unwrap_or_default();
        let value = match &node.schema {
            None => Value::Bool(true),
            Some(schema) => decode(schema.kind(), schema.leaf_type(), wire).unwrap_or_else(|e| {
                debug!(node = %schema.name(), wire, error = %e, "stored value does not decode");
                Value::String(wire.to_string())
            }),
        };
        Self { tree, id, value }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The stored canonical string of a leaf or leaf-list member.
    pub fn wire_value(&self) -> Option<&'t str> {
        self.tree.arena[self.id].value.as_deref()
    }

    /// Resolved, key-qualified path; `/` for the document root.
    pub fn path(&self) -> String {
        self.tree.node_path(self.id)
    }

    /// The bound schema node; `None` for the document root.
    pub fn get_schema(&self) -> Option<&'t Arc<SchemaNode>> {
        self.tree.arena[self.id].schema.as_ref()
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.get_schema().map(|s| s.kind())
    }

    pub fn name(&self) -> &'t str {
        self.get_schema().map_or("/", |s| s.name())
    }

    pub fn is_root(&self) -> bool {
        self.tree.arena[self.id].schema.is_none()
    }

    pub fn parent(&self) -> Option<DataNode<'t>> {
        self.tree.arena[self.id]
            .parent
            .map(|p| DataNode::new(self.tree, p))
    }

    /// Children in insertion order.
    pub fn children(&self) -> Vec<DataNode<'t>> {
        self.tree.arena[self.id]
            .children
            .iter()
            .map(|&c| DataNode::new(self.tree, c))
            .collect()
    }

    /// The document root of the tree this node belongs to.
    pub fn get_root(&self) -> DataNode<'t> {
        let top = self.tree.arena.ancestors(self.id).last().unwrap_or(self.id);
        DataNode::new(self.tree, top)
    }

    /// This node and all its descendants, ordered by resolved path.
    ///
    /// The document root itself is never included, so enumerating from the
    /// root yields exactly the data nodes.
    pub fn enumerate(&self) -> Vec<DataNode<'t>> {
        let arena = &self.tree.arena;
        let mut found: Vec<(String, NodeId)> = arena
            .descendants(self.id)
            .into_iter()
            .filter(|&id| arena[id].schema.is_some())
            .map(|id| (self.tree.node_path(id), id))
            .collect();
        found.sort();
        found
            .into_iter()
            .map(|(_, id)| DataNode::new(self.tree, id))
            .collect()
    }
}

impl fmt::Display for DataNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl fmt::Debug for DataNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataNode")
            .field("path", &self.path())
            .field("value", &self.value)
            .finish()
    }
}
