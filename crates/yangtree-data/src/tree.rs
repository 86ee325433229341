//! The path-addressed data tree.
//!
//! [`DataTree`] owns an arena of nodes under a synthetic document root. The
//! root exists from the first successful `set`, `load` or `merge` onwards;
//! before that the tree is EMPTY and only `load`/`loads` may replace it
//! wholesale.
//!
//! # Invariants
//!
//! - No two sibling list entries share a key tuple, and no two sibling
//!   leaf-list members share a value.
//! - Key leaves of a list entry come first, in schema key order, and always
//!   match the entry's identity.
//! - Every stored leaf value is the canonical form for its declared type.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use yangtree_schema::{Level, Module, SchemaContext, SchemaNode};
use yangtree_types::{encode, is_quotable, LeafType, NodeKind, PathExpr, Predicate, Step, Value};

use crate::arena::{Arena, Node, NodeId};
use crate::codec::{self, Element, Format};
use crate::error::{DataError, DataResult};
use crate::merge::MergeOp;
use crate::node::DataNode;

/// A mutable instance-data tree bound to one schema context.
pub struct DataTree {
    ctx: Arc<SchemaContext>,
    pub(crate) arena: Arena,
    pub(crate) root: Option<NodeId>,
}

impl fmt::Debug for DataTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTree")
            .field("populated", &self.root.is_some())
            .field("nodes", &self.len())
            .finish()
    }
}

/// One resolved step of a `set` path.
struct PlannedStep {
    schema: Arc<SchemaNode>,
    /// Canonical key values in schema key order (lists only).
    keys: Vec<String>,
    /// Canonical `[.='v']` value (leaf-lists only).
    member: Option<String>,
}

impl DataTree {
    /// Create an EMPTY tree.
    pub fn new(ctx: Arc<SchemaContext>) -> Self {
        Self {
            ctx,
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn context(&self) -> &Arc<SchemaContext> {
        &self.ctx
    }

    /// `true` until the tree is populated for the first time. Deleting all
    /// content does not make a tree empty again.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of data nodes, not counting the document root.
    pub fn len(&self) -> usize {
        self.arena.len().saturating_sub(1)
    }

    /// The document root, if the tree is populated.
    pub fn root(&self) -> Option<DataNode<'_>> {
        self.root.map(|id| DataNode::new(self, id))
    }

    /// A view of a node by handle. `None` for stale handles.
    pub fn node(&self, id: NodeId) -> Option<DataNode<'_>> {
        self.arena.contains(id).then(|| DataNode::new(self, id))
    }

    pub(crate) fn ensure_root(&mut self) -> NodeId {
        match self.root {
            Some(root) => root,
            None => {
                let root = self.arena.insert(Node::root());
                self.root = Some(root);
                root
            }
        }
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Create or update the node at `path`, materializing every missing
    /// ancestor on the way.
    ///
    /// Setting a leaf to the value it already holds is a no-op. A list
    /// entry path without value creates the entry and its key leaves; a
    /// leaf-list path without `[.='v']` adds `value` as a member unless it
    /// is already present. The whole path and value are checked before any
    /// node is created, so a failed `set` leaves the tree untouched.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> DataResult<()> {
        let value = value.into();
        let expr = PathExpr::parse(path)?;
        let (steps, stored) = self.plan(path, &expr, &value)?;

        let mut current = self.ensure_root();
        for (i, step) in steps.iter().enumerate() {
            let last = i + 1 == steps.len();
            current = match step.schema.kind() {
                NodeKind::Container => match self.find_child(current, &step.schema) {
                    Some(id) => id,
                    None => self.arena.append(current, Node::new(step.schema.clone(), None)),
                },
                NodeKind::List => match self.find_list_entry(current, &step.schema, &step.keys) {
                    Some(id) => id,
                    None => self.create_list_entry(current, &step.schema, &step.keys),
                },
                NodeKind::Leaf if last => match self.find_child(current, &step.schema) {
                    Some(id) => {
                        if self.arena[id].value != stored {
                            self.arena[id].value = stored.clone();
                        }
                        id
                    }
                    None => self.arena.append(current, Node::new(step.schema.clone(), stored.clone())),
                },
                NodeKind::LeafList if last => {
                    let member = stored.clone().unwrap_or_default();
                    match self.find_member(current, &step.schema, &member) {
                        Some(id) => id,
                        None => self.arena.append(current, Node::new(step.schema.clone(), Some(member))),
                    }
                }
                _ => unreachable!("checked by plan"),
            };
        }
        debug!(path, value = ?stored, "set");
        Ok(())
    }

    /// Resolve every step of a `set` path against the schema and compute
    /// the canonical value to store.
    fn plan(&self, path: &str, expr: &PathExpr, value: &Value) -> DataResult<(Vec<PlannedStep>, Option<String>)> {
        let wire = encode(value);
        let fail = |reason: String| DataError::path(path, wire.as_deref(), reason);

        if expr.has_wildcard() {
            return Err(fail("wildcard steps cannot be set".into()));
        }
        let module = self.step_module(path, expr)?.ok_or_else(|| {
            fail(format!(
                "module \"{}\" is not implemented",
                expr.module().unwrap_or_default()
            ))
        })?;

        let mut steps: Vec<PlannedStep> = Vec::with_capacity(expr.len());
        for (i, step) in expr.steps.iter().enumerate() {
            let last = i + 1 == expr.len();
            if let Some(prefix) = &step.prefix {
                if !module.answers_to(prefix) {
                    return Err(fail(format!("prefix \"{prefix}\" does not name module \"{}\"", module.name())));
                }
            }
            let name = step.name().unwrap_or_default();
            let schema = match steps.last() {
                None => module.child(name),
                Some(parent) => parent.schema.child(name),
            }
            .cloned()
            .ok_or_else(|| fail(format!("unknown element \"{name}\"")))?;

            match schema.kind() {
                NodeKind::Anydata => return Err(fail(format!("anydata \"{name}\" cannot be set"))),
                kind if kind.is_terminal() && !last => {
                    return Err(fail(format!("{kind} \"{name}\" cannot have children")))
                }
                _ => {}
            }

            let mut planned = PlannedStep {
                schema: schema.clone(),
                keys: Vec::new(),
                member: None,
            };
            for predicate in &step.predicates {
                match (predicate, schema.kind()) {
                    (Predicate::Key { .. }, NodeKind::List) => {}
                    (Predicate::Value(v), NodeKind::LeafList) => {
                        planned.member = Some(canonical(&schema, v).map_err(fail)?);
                    }
                    (p, kind) => return Err(fail(format!("predicate {p} is not allowed on {kind} \"{name}\""))),
                }
            }
            if schema.kind() == NodeKind::List {
                planned.keys = list_keys(&schema, step).map_err(fail)?;
            }
            steps.push(planned);
        }

        let target = steps.last().ok_or_else(|| fail("empty path".into()))?;
        let stored = match target.schema.kind() {
            NodeKind::Leaf => {
                let wire = match (target.schema.leaf_type(), value) {
                    // The presence marker an empty leaf decodes to sets it too.
                    (Some(LeafType::Empty), Value::Bool(true)) => None,
                    _ => wire.clone(),
                };
                let stored = canonical_opt(&target.schema, wire.as_deref()).map_err(fail)?;
                if let Some(parent) = steps.len().checked_sub(2).map(|i| &steps[i]) {
                    if let Some(pos) = parent.schema.keys().iter().position(|k| k == target.schema.name()) {
                        if parent.keys[pos] != stored {
                            return Err(fail(format!(
                                "key \"{}\" must match the list predicate '{}'",
                                target.schema.name(),
                                parent.keys[pos]
                            )));
                        }
                    }
                }
                Some(stored)
            }
            NodeKind::LeafList => match (&target.member, wire.as_deref()) {
                (Some(member), None) => Some(member.clone()),
                (member, wire) => {
                    let stored = canonical_opt(&target.schema, wire)
                        .and_then(addressable)
                        .map_err(fail)?;
                    if member.as_ref().map_or(false, |m| *m != stored) {
                        return Err(fail("value does not match the [.=] predicate".into()));
                    }
                    Some(stored)
                }
            },
            _ => None,
        };
        Ok((steps, stored))
    }

    /// Delete the single node `path` resolves to.
    ///
    /// No match is a no-op. More than one match fails rather than picking
    /// one, as does deleting a list key leaf.
    pub fn delete(&mut self, path: &str) -> DataResult<()> {
        let matches = self.resolve(path)?;
        match matches.as_slice() {
            [] => Ok(()),
            [id] => {
                if self.is_key_leaf(*id) {
                    return Err(DataError::path(path, None, "list keys cannot be deleted"));
                }
                self.arena.remove(*id);
                debug!(path, "deleted");
                Ok(())
            }
            many => Err(DataError::path(
                path,
                None,
                format!("resolves to {} nodes; only single-node deletion is supported", many.len()),
            )),
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Nodes matching `path`, in document order. An empty tree or no match
    /// gives an empty list.
    pub fn get(&self, path: &str) -> DataResult<Vec<DataNode<'_>>> {
        Ok(self
            .resolve(path)?
            .into_iter()
            .map(|id| DataNode::new(self, id))
            .collect())
    }

    /// Resolved, key-qualified paths of the nodes matching `path`.
    pub fn paths(&self, path: &str) -> DataResult<Vec<String>> {
        Ok(self
            .resolve(path)?
            .into_iter()
            .map(|id| self.node_path(id))
            .collect())
    }

    /// Number of nodes matching `path`.
    pub fn count(&self, path: &str) -> DataResult<usize> {
        Ok(self.resolve(path)?.len())
    }

    /// Every data node, ordered by resolved path.
    pub fn datanodes(&self) -> Vec<DataNode<'_>> {
        self.root().map(|root| root.enumerate()).unwrap_or_default()
    }

    /// Every data node in document order: depth-first, siblings in
    /// insertion order.
    pub fn walk(&self) -> Vec<DataNode<'_>> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        self.arena
            .descendants(root)
            .into_iter()
            .skip(1)
            .map(|id| DataNode::new(self, id))
            .collect()
    }

    fn resolve(&self, path: &str) -> DataResult<Vec<NodeId>> {
        let expr = PathExpr::parse(path)?;
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };
        let Some(module) = self.step_module(path, &expr)? else {
            return Ok(Vec::new());
        };

        let mut current = vec![root];
        for step in &expr.steps {
            if step.prefix.as_deref().map_or(false, |p| !module.answers_to(p)) {
                return Ok(Vec::new());
            }
            current = current
                .iter()
                .flat_map(|&id| self.arena[id].children.iter().copied())
                .filter(|&child| self.step_matches(child, module.name(), step))
                .collect();
        }
        Ok(current)
    }

    /// The implemented module named by the first step. A missing prefix is
    /// an error; an unknown module is `None`.
    fn step_module(&self, path: &str, expr: &PathExpr) -> DataResult<Option<&Arc<Module>>> {
        let prefix = expr
            .module()
            .ok_or_else(|| DataError::path(path, None, "the first step must name a module"))?;
        Ok(self.ctx.implemented_module(prefix))
    }

    fn step_matches(&self, id: NodeId, module: &str, step: &Step) -> bool {
        let node = &self.arena[id];
        let Some(schema) = &node.schema else {
            return false;
        };
        if schema.module() != module || step.name().map_or(false, |n| n != schema.name()) {
            return false;
        }
        step.predicates.iter().all(|p| match p {
            Predicate::Key { name, value } => {
                schema.kind() == NodeKind::List
                    && schema.child(name).map_or(false, |key| {
                        self.key_value(id, name)
                            .map_or(false, |stored| literal_matches(key, stored, value))
                    })
            }
            Predicate::Value(value) => {
                schema.kind() == NodeKind::LeafList
                    && node
                        .value
                        .as_deref()
                        .map_or(false, |stored| literal_matches(schema, stored, value))
            }
        })
    }

    /// Fully-qualified path of a node: module prefix on the top step only,
    /// key predicates on list entries, value predicates on leaf-list members.
    pub(crate) fn node_path(&self, id: NodeId) -> String {
        let mut chain: Vec<NodeId> = self.arena.ancestors(id).collect();
        chain.reverse();
        chain.push(id);

        let mut expr = PathExpr { steps: Vec::new() };
        for n in chain {
            let node = &self.arena[n];
            let Some(schema) = &node.schema else {
                continue;
            };
            let mut step = Step::named(schema.name());
            if expr.is_empty() {
                step.prefix = Some(schema.module().to_string());
            }
            match schema.kind() {
                NodeKind::List => {
                    for key in schema.keys() {
                        step.predicates.push(Predicate::Key {
                            name: key.clone(),
                            value: self.key_value(n, key).unwrap_or_default().to_string(),
                        });
                    }
                }
                NodeKind::LeafList => {
                    step.predicates
                        .push(Predicate::Value(node.value.clone().unwrap_or_default()));
                }
                _ => {}
            }
            expr.steps.push(step);
        }
        if expr.is_empty() {
            "/".to_string()
        } else {
            expr.to_string()
        }
    }

    // ---------------------------------------------------------------
    // Sibling identity
    // ---------------------------------------------------------------

    pub(crate) fn find_child(&self, parent: NodeId, schema: &SchemaNode) -> Option<NodeId> {
        self.arena[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.arena[c].is_instance_of(schema))
    }

    pub(crate) fn find_list_entry(&self, parent: NodeId, schema: &SchemaNode, keys: &[String]) -> Option<NodeId> {
        self.arena[parent].children.iter().copied().find(|&c| {
            self.arena[c].is_instance_of(schema) && self.entry_keys(c).as_slice() == keys
        })
    }

    pub(crate) fn find_member(&self, parent: NodeId, schema: &SchemaNode, value: &str) -> Option<NodeId> {
        self.arena[parent].children.iter().copied().find(|&c| {
            self.arena[c].is_instance_of(schema) && self.arena[c].value.as_deref() == Some(value)
        })
    }

    /// The sibling under `parent` with the same identity as `other` in
    /// `src` (same schema node, and same keys or value where relevant).
    pub(crate) fn find_same(&self, parent: NodeId, src: &DataTree, other: NodeId) -> Option<NodeId> {
        let node = &src.arena[other];
        let schema = node.schema.as_deref()?;
        match schema.kind() {
            NodeKind::List => self.find_list_entry(parent, schema, &src.entry_keys(other)),
            NodeKind::LeafList => self.find_member(parent, schema, node.value.as_deref()?),
            _ => self.find_child(parent, schema),
        }
    }

    /// Append a list entry together with its key leaves.
    pub(crate) fn create_list_entry(&mut self, parent: NodeId, schema: &Arc<SchemaNode>, keys: &[String]) -> NodeId {
        let entry = self.arena.append(parent, Node::new(schema.clone(), None));
        for (name, value) in schema.keys().iter().zip(keys) {
            if let Some(key_schema) = schema.child(name) {
                self.arena
                    .append(entry, Node::new(key_schema.clone(), Some(value.clone())));
            }
        }
        entry
    }

    /// Key values of a list entry in schema key order.
    pub(crate) fn entry_keys(&self, id: NodeId) -> Vec<String> {
        let Some(schema) = &self.arena[id].schema else {
            return Vec::new();
        };
        schema
            .keys()
            .iter()
            .map(|k| self.key_value(id, k).unwrap_or_default().to_string())
            .collect()
    }

    pub(crate) fn key_value(&self, entry: NodeId, key: &str) -> Option<&str> {
        self.arena[entry].children.iter().find_map(|&c| {
            let node = &self.arena[c];
            match &node.schema {
                Some(s) if s.name() == key && s.kind() == NodeKind::Leaf => node.value.as_deref(),
                _ => None,
            }
        })
    }

    pub(crate) fn is_key_leaf(&self, id: NodeId) -> bool {
        let node = &self.arena[id];
        match (&node.schema, node.parent) {
            (Some(schema), Some(parent)) => self.arena[parent]
                .schema
                .as_ref()
                .map_or(false, |p| p.kind() == NodeKind::List && p.is_key(schema.name())),
            _ => false,
        }
    }

    // ---------------------------------------------------------------
    // Load / dump
    // ---------------------------------------------------------------

    /// Replace an EMPTY tree with the content of `payload`.
    ///
    /// Unknown elements are rejected and the result is validated. Fails
    /// with [`DataError::State`] if the tree is already populated.
    pub fn loads(&mut self, payload: &str, format: Format) -> DataResult<()> {
        if self.root.is_some() {
            return Err(DataError::State(
                "load is not supported when the tree already has data; use merge instead".into(),
            ));
        }
        let elements = codec::parse(&self.ctx, payload, format)?;
        let root = self.ensure_root();
        let result = self
            .ingest(root, &elements, true, &mut HashMap::new())
            .and_then(|()| self.validate());
        if let Err(e) = result {
            self.arena = Arena::new();
            self.root = None;
            return Err(e);
        }
        debug!(%format, nodes = self.len(), "tree loaded");
        Ok(())
    }

    /// [`loads`](Self::loads) from a file.
    pub fn load(&mut self, file: impl AsRef<Path>, format: Format) -> DataResult<()> {
        if self.root.is_some() {
            return Err(DataError::State(
                "load is not supported when the tree already has data; use merge instead".into(),
            ));
        }
        let payload = fs::read_to_string(file)?;
        self.loads(&payload, format)
    }

    /// Serialize every top-level node.
    pub fn dumps(&self, format: Format) -> DataResult<String> {
        let root = self
            .root
            .ok_or_else(|| DataError::State("no data to dump".into()))?;
        codec::write(self, root, format)
    }

    /// [`dumps`](Self::dumps) to a file.
    pub fn dump(&self, file: impl AsRef<Path>, format: Format) -> DataResult<()> {
        let text = self.dumps(format)?;
        fs::write(file, text)?;
        Ok(())
    }

    /// Bind parsed elements to schema nodes under `parent`, merging into
    /// whatever already exists there. Operation annotations are collected
    /// into `ops`.
    pub(crate) fn ingest(
        &mut self,
        parent: NodeId,
        elements: &[Element],
        strict: bool,
        ops: &mut HashMap<NodeId, MergeOp>,
    ) -> DataResult<()> {
        for el in elements {
            let Some(schema) = self.schema_for(parent, el) else {
                let path = self.child_path(parent, &el.name);
                if strict {
                    self.ctx.record(Level::Error, "unknown element", Some(&path), None);
                    return Err(DataError::path(
                        path,
                        el.value.as_deref(),
                        self.ctx.error_message("payload does not match the schema"),
                    ));
                }
                warn!(path = %path, "skipping unknown element");
                self.ctx
                    .record(Level::Warning, "unknown element skipped", Some(&path), None);
                continue;
            };
            let op = el.operation.as_deref().map(str::parse::<MergeOp>).transpose();
            let op = op.map_err(|e| DataError::path(self.child_path(parent, &el.name), None, e))?;
            let removing = op == Some(MergeOp::Remove);

            let id = match schema.kind() {
                NodeKind::Anydata => {
                    debug!(name = %schema.name(), "anydata content ignored");
                    continue;
                }
                NodeKind::Container => match self.find_child(parent, &schema) {
                    Some(id) => id,
                    None => self.arena.append(parent, Node::new(schema.clone(), None)),
                },
                NodeKind::List => {
                    let keys = self.element_keys(parent, &schema, el)?;
                    match self.find_list_entry(parent, &schema, &keys) {
                        Some(id) => id,
                        None => self.create_list_entry(parent, &schema, &keys),
                    }
                }
                NodeKind::Leaf | NodeKind::LeafList => {
                    if !el.children.is_empty() {
                        return Err(DataError::path(
                            self.child_path(parent, &el.name),
                            None,
                            format!("{} cannot have children", schema.kind()),
                        ));
                    }
                    let stored = canonical_opt(&schema, el.value.as_deref()).and_then(|v| match schema.kind() {
                        NodeKind::LeafList => addressable(v),
                        _ => Ok(v),
                    });
                    let stored = match stored {
                        Ok(v) => v,
                        // The value of a node being removed is never stored.
                        Err(_) if removing && schema.kind() == NodeKind::Leaf => String::new(),
                        Err(reason) => {
                            return Err(DataError::path(
                                self.child_path(parent, &el.name),
                                el.value.as_deref(),
                                reason,
                            ))
                        }
                    };
                    if schema.kind() == NodeKind::Leaf {
                        match self.find_child(parent, &schema) {
                            Some(id) => {
                                if !self.is_key_leaf(id) {
                                    self.arena[id].value = Some(stored);
                                }
                                id
                            }
                            None => self.arena.append(parent, Node::new(schema.clone(), Some(stored))),
                        }
                    } else {
                        match self.find_member(parent, &schema, &stored) {
                            Some(id) => id,
                            None => self.arena.append(parent, Node::new(schema.clone(), Some(stored))),
                        }
                    }
                }
            };
            if let Some(op) = op {
                ops.insert(id, op);
            }
            if schema.kind().is_inner() {
                self.ingest(id, &el.children, strict, ops)?;
            }
        }
        Ok(())
    }

    fn schema_for(&self, parent: NodeId, el: &Element) -> Option<Arc<SchemaNode>> {
        match &self.arena[parent].schema {
            None => {
                let module = self.ctx.implemented_module(el.module.as_deref()?)?;
                module.child(&el.name).cloned()
            }
            Some(p) => {
                if el.module.as_deref().map_or(false, |m| m != p.module()) {
                    return None;
                }
                p.child(&el.name).cloned()
            }
        }
    }

    /// Canonical key values of a list element, in schema key order.
    fn element_keys(&self, parent: NodeId, schema: &SchemaNode, el: &Element) -> DataResult<Vec<String>> {
        let path = self.child_path(parent, &el.name);
        schema
            .keys()
            .iter()
            .map(|key| {
                let raw = el
                    .children
                    .iter()
                    .find(|c| &c.name == key)
                    .and_then(|c| c.value.as_deref())
                    .ok_or_else(|| DataError::path(&path, None, format!("list entry is missing key \"{key}\"")))?;
                let key_schema = schema
                    .child(key)
                    .ok_or_else(|| DataError::path(&path, None, format!("unknown key \"{key}\"")))?;
                canonical(key_schema, raw)
                    .and_then(addressable)
                    .map_err(|reason| DataError::path(&path, Some(raw), reason))
            })
            .collect()
    }

    /// Path used in messages about a child element of `parent`.
    pub(crate) fn child_path(&self, parent: NodeId, name: &str) -> String {
        match self.node_path(parent).as_str() {
            "/" => format!("/{name}"),
            base => format!("{base}/{name}"),
        }
    }
}

/// Canonical form of a literal for a leaf or leaf-list schema node.
fn canonical(schema: &SchemaNode, raw: &str) -> Result<String, String> {
    canonical_opt(schema, Some(raw))
}

fn canonical_opt(schema: &SchemaNode, raw: Option<&str>) -> Result<String, String> {
    match schema.leaf_type() {
        Some(ty) => ty.canonicalize(raw).map_err(|e| e.to_string()),
        None => Ok(raw.unwrap_or_default().to_string()),
    }
}

/// Key and leaf-list values must be writable in a path predicate.
fn addressable(value: String) -> Result<String, String> {
    if is_quotable(&value) {
        Ok(value)
    } else {
        Err("value mixes single and double quotes and cannot appear in a path predicate".into())
    }
}

/// Whether a predicate literal denotes the stored canonical value.
fn literal_matches(schema: &SchemaNode, stored: &str, literal: &str) -> bool {
    match canonical(schema, literal) {
        Ok(c) => c == stored,
        Err(_) => stored == literal,
    }
}

/// Canonical key values of a list step, requiring exactly the schema keys.
fn list_keys(schema: &SchemaNode, step: &Step) -> Result<Vec<String>, String> {
    let given: Vec<(&str, &str)> = step.keys().collect();
    let arity_ok = given.len() == schema.keys().len() && given.iter().all(|(k, _)| schema.is_key(k));
    if !arity_ok {
        return Err(format!(
            "list \"{}\" is addressed by exactly the keys [{}]",
            schema.name(),
            schema.keys().join(", ")
        ));
    }
    schema
        .keys()
        .iter()
        .map(|key| {
            let raw = given
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| format!("missing key \"{key}\""))?;
            let key_schema = schema.child(key).ok_or_else(|| format!("unknown key \"{key}\""))?;
            canonical(key_schema, raw)
        })
        .collect()
}
