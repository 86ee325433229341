//! Compiled modules and schema nodes.
//!
//! [`ModuleDef`] is the serializable description of a compiled module (the
//! content of a `<name>.yang.json` file). [`Module::compile`] checks it and
//! turns it into an immutable tree of [`SchemaNode`]s.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use yangtree_types::{quote_literal, LeafType, NodeKind};

/// Serializable description of one module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDef {
    pub name: String,
    /// XML namespace; defaults to `urn:<name>`.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    /// Modules loaded (not implemented) before this one.
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

/// Serializable description of one schema node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeDef {
    pub name: String,
    pub kind: NodeKind,
    #[serde(rename = "type", default)]
    pub leaf_type: Option<LeafType>,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub presence: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub min_elements: u32,
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>, nodes: Vec<NodeDef>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            prefix: None,
            revision: None,
            imports: Vec::new(),
            nodes,
        }
    }
}

impl NodeDef {
    fn bare(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            leaf_type: None,
            keys: Vec::new(),
            mandatory: false,
            presence: false,
            default: None,
            min_elements: 0,
            children: Vec::new(),
        }
    }

    pub fn container(name: impl Into<String>, children: Vec<NodeDef>) -> Self {
        Self {
            children,
            ..Self::bare(name, NodeKind::Container)
        }
    }

    pub fn list(name: impl Into<String>, keys: &[&str], children: Vec<NodeDef>) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            children,
            ..Self::bare(name, NodeKind::List)
        }
    }

    pub fn leaf(name: impl Into<String>, ty: LeafType) -> Self {
        Self {
            leaf_type: Some(ty),
            ..Self::bare(name, NodeKind::Leaf)
        }
    }

    pub fn leaf_list(name: impl Into<String>, ty: LeafType) -> Self {
        Self {
            leaf_type: Some(ty),
            ..Self::bare(name, NodeKind::LeafList)
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn presence(mut self) -> Self {
        self.presence = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min_elements(mut self, n: u32) -> Self {
        self.min_elements = n;
        self
    }
}

/// A compiled module.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    namespace: String,
    prefix: String,
    revision: Option<String>,
    implemented: bool,
    nodes: Vec<Arc<SchemaNode>>,
}

impl Module {
    /// Compile a module description.
    ///
    /// Returns every problem found as `(schema path, message)` pairs when
    /// the description is inconsistent.
    pub fn compile(def: &ModuleDef, implemented: bool) -> Result<Module, Vec<(String, String)>> {
        let mut problems = Vec::new();
        let base = format!("/{}:", def.name);
        let nodes = compile_children(&def.name, &def.nodes, &base, &base, &mut problems);
        if !problems.is_empty() {
            return Err(problems);
        }
        Ok(Module {
            name: def.name.clone(),
            namespace: def
                .namespace
                .clone()
                .unwrap_or_else(|| format!("urn:{}", def.name)),
            prefix: def.prefix.clone().unwrap_or_else(|| def.name.clone()),
            revision: def.revision.clone(),
            implemented,
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Whether data may be instantiated for this module.
    pub fn is_implemented(&self) -> bool {
        self.implemented
    }

    pub(crate) fn set_implemented(&mut self) {
        self.implemented = true;
    }

    /// Top-level schema nodes.
    pub fn nodes(&self) -> &[Arc<SchemaNode>] {
        &self.nodes
    }

    pub fn child(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Whether `prefix` names this module (by name or declared prefix).
    pub fn answers_to(&self, prefix: &str) -> bool {
        self.name == prefix || self.prefix == prefix
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}@{}", self.name, rev),
            None => f.write_str(&self.name),
        }
    }
}

/// One immutable element of the compiled schema tree.
#[derive(Debug, PartialEq)]
pub struct SchemaNode {
    name: String,
    module: String,
    kind: NodeKind,
    leaf_type: Option<LeafType>,
    keys: Vec<String>,
    mandatory: bool,
    presence: bool,
    default: Option<String>,
    min_elements: u32,
    schema_path: String,
    data_pattern: String,
    children: Vec<Arc<SchemaNode>>,
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning module.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// `module:name`.
    pub fn fullname(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn leaf_type(&self) -> Option<&LeafType> {
        self.leaf_type.as_ref()
    }

    /// Key leaf names of a list, in declaration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.keys.iter().any(|k| k == name)
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn is_presence(&self) -> bool {
        self.presence
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn min_elements(&self) -> u32 {
        self.min_elements
    }

    /// Schema path with every step prefixed, e.g. `/m:types/m:str1`.
    pub fn schema_path(&self) -> &str {
        &self.schema_path
    }

    /// Data path template with `%s` in place of list key values, e.g.
    /// `/m:types/collection[x='%s']/y`.
    pub fn data_path_pattern(&self) -> &str {
        &self.data_pattern
    }

    pub fn children(&self) -> &[Arc<SchemaNode>] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.children.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn compile_children(
    module: &str,
    defs: &[NodeDef],
    schema_prefix: &str,
    data_prefix: &str,
    problems: &mut Vec<(String, String)>,
) -> Vec<Arc<SchemaNode>> {
    let mut out: Vec<Arc<SchemaNode>> = Vec::with_capacity(defs.len());
    for def in defs {
        let schema_path = format!("{schema_prefix}{}", def.name);
        if out.iter().any(|n| n.name == def.name) {
            problems.push((schema_path, format!("duplicate node name \"{}\"", def.name)));
            continue;
        }

        check_node(def, &schema_path, problems);

        let keys: String = def
            .keys
            .iter()
            .map(|k| format!("[{k}={}]", quote_literal("%s")))
            .collect();
        let data_pattern = format!("{data_prefix}{}{keys}", def.name);
        let children = compile_children(
            module,
            &def.children,
            &format!("{schema_path}/{module}:"),
            &format!("{data_pattern}/"),
            problems,
        );

        out.push(Arc::new(SchemaNode {
            name: def.name.clone(),
            module: module.to_string(),
            kind: def.kind,
            leaf_type: def.leaf_type.clone(),
            keys: def.keys.clone(),
            mandatory: def.mandatory,
            presence: def.presence,
            default: def.default.clone(),
            min_elements: def.min_elements,
            schema_path,
            data_pattern,
            children,
        }));
    }
    out
}

fn check_node(def: &NodeDef, path: &str, problems: &mut Vec<(String, String)>) {
    let mut problem = |msg: String| problems.push((path.to_string(), msg));

    match def.kind {
        NodeKind::Leaf | NodeKind::LeafList => {
            if def.leaf_type.is_none() {
                problem(format!("{} \"{}\" has no type", def.kind, def.name));
            }
            if !def.children.is_empty() {
                problem(format!("{} \"{}\" cannot have children", def.kind, def.name));
            }
            if let (Some(ty), Some(dflt)) = (&def.leaf_type, &def.default) {
                if let Err(e) = ty.canonicalize(Some(dflt)) {
                    problem(format!("invalid default: {e}"));
                }
            }
        }
        NodeKind::Container | NodeKind::List | NodeKind::Anydata => {
            if def.leaf_type.is_some() {
                problem(format!("{} \"{}\" cannot have a type", def.kind, def.name));
            }
        }
    }

    if def.kind == NodeKind::List {
        if def.keys.is_empty() {
            problem(format!("list \"{}\" has no keys", def.name));
        }
        for key in &def.keys {
            match def.children.iter().find(|c| &c.name == key) {
                Some(c) if c.kind == NodeKind::Leaf && c.leaf_type != Some(LeafType::Empty) => {}
                Some(_) => problem(format!("key \"{key}\" must be a non-empty leaf")),
                None => problem(format!("key \"{key}\" is not a child of list \"{}\"", def.name)),
            }
        }
    } else if !def.keys.is_empty() {
        problem(format!("only lists have keys, \"{}\" is a {}", def.name, def.kind));
    }
}
