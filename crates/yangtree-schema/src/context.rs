//! The schema context: module registry and schema lookup.
//!
//! # Invariants
//!
//! - Module names are unique within a context.
//! - Loaded modules never change except for being marked implemented.
//! - The diagnostics queue is drained by every error it contributes to.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use yangtree_types::{PathExpr, StepName};

use crate::config::{resolve_search_dirs, ContextConfig};
use crate::diagnostics::{Diagnostic, DiagnosticQueue, DiagnosticSink, Level, TracingSink};
use crate::error::{Result, SchemaError};
use crate::module::{Module, ModuleDef, SchemaNode};

/// File extension of compiled module files.
pub const MODULE_FILE_EXT: &str = ".yang.json";

/// Owns the compiled schema shared by data trees.
pub struct SchemaContext {
    config: ContextConfig,
    search_dirs: Vec<PathBuf>,
    modules: Vec<Arc<Module>>,
    diagnostics: DiagnosticQueue,
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for SchemaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContext")
            .field("search_dirs", &self.search_dirs)
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("pending_diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl SchemaContext {
    /// Create a context that logs diagnostics through `tracing`.
    pub fn new(config: ContextConfig) -> Self {
        let sink = Arc::new(TracingSink::new(config.log_level));
        Self::with_sink(config, sink)
    }

    /// Create a context with an explicit diagnostics sink.
    pub fn with_sink(config: ContextConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let search_dirs = resolve_search_dirs(&config, |k| std::env::var(k).ok());
        debug!(dirs = search_dirs.len(), "schema context created");
        Self {
            config,
            search_dirs,
            modules: Vec::new(),
            diagnostics: DiagnosticQueue::default(),
            sink,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Directories searched for compiled module files, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Append a search directory. Fails if it is not a directory.
    pub fn add_search_dir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SchemaError::InvalidSearchDir(dir.to_path_buf()));
        }
        if !self.search_dirs.iter().any(|d| d == dir) {
            self.search_dirs.push(dir.to_path_buf());
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Modules
    // ---------------------------------------------------------------

    /// Load a module by name from the search directories and mark it
    /// implemented. Imports are loaded first, not implemented.
    pub fn load_module(&mut self, name: &str) -> Result<Arc<Module>> {
        self.load_inner(name, true, &mut Vec::new())
    }

    /// Register a module built in code and mark it implemented.
    ///
    /// Imports it names must already be loaded or be loadable from the
    /// search directories.
    pub fn add_module(&mut self, def: ModuleDef) -> Result<Arc<Module>> {
        let mut loading = vec![def.name.clone()];
        self.register(def, true, &mut loading)
    }

    /// An already-loaded module.
    pub fn get_module(&self, name: &str) -> Result<Arc<Module>> {
        match self.find_module(name) {
            Some(m) => Ok(m.clone()),
            None => {
                self.record(Level::Error, &format!("module \"{name}\" is not loaded"), None, None);
                Err(SchemaError::ModuleNotFound {
                    name: name.to_string(),
                    message: self.error_message("cannot get module"),
                })
            }
        }
    }

    /// An implemented module answering to `prefix` (name or prefix).
    pub fn implemented_module(&self, prefix: &str) -> Option<&Arc<Module>> {
        self.modules
            .iter()
            .find(|m| m.is_implemented() && m.answers_to(prefix))
    }

    /// An implemented module by XML namespace.
    pub fn module_by_namespace(&self, namespace: &str) -> Option<&Arc<Module>> {
        self.modules
            .iter()
            .find(|m| m.is_implemented() && m.namespace() == namespace)
    }

    /// Iterate over implemented modules. Each call starts from the first
    /// module again.
    pub fn modules(&self) -> Modules<'_> {
        Modules { ctx: self, idx: 0 }
    }

    fn find_module(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.iter().find(|m| m.name() == name)
    }

    fn load_inner(
        &mut self,
        name: &str,
        implement: bool,
        loading: &mut Vec<String>,
    ) -> Result<Arc<Module>> {
        if let Some(idx) = self.modules.iter().position(|m| m.name() == name) {
            if implement && !self.modules[idx].is_implemented() {
                let mut module = Module::clone(&self.modules[idx]);
                module.set_implemented();
                self.modules[idx] = Arc::new(module);
                info!(module = name, "module implemented");
            }
            return Ok(self.modules[idx].clone());
        }
        if loading.iter().any(|n| n == name) {
            self.record(Level::Error, &format!("circular import of \"{name}\""), None, None);
            return Err(SchemaError::InvalidModule {
                name: name.to_string(),
                message: self.error_message("cannot load module"),
            });
        }

        let Some(file) = self.locate(name) else {
            let dirs: Vec<String> = self.search_dirs.iter().map(|d| d.display().to_string()).collect();
            self.record(
                Level::Error,
                &format!("module \"{name}\" not found in search dirs [{}]", dirs.join(", ")),
                None,
                None,
            );
            return Err(SchemaError::ModuleNotFound {
                name: name.to_string(),
                message: self.error_message("cannot load module"),
            });
        };

        let text = fs::read_to_string(&file)?;
        let def: ModuleDef = match serde_json::from_str(&text) {
            Ok(def) => def,
            Err(e) => {
                self.record(Level::Error, &e.to_string(), Some(&file.display().to_string()), None);
                return Err(SchemaError::InvalidModule {
                    name: name.to_string(),
                    message: self.error_message("cannot load module"),
                });
            }
        };
        if def.name != name {
            self.record(
                Level::Error,
                &format!("file declares module \"{}\", expected \"{name}\"", def.name),
                Some(&file.display().to_string()),
                None,
            );
            return Err(SchemaError::InvalidModule {
                name: name.to_string(),
                message: self.error_message("cannot load module"),
            });
        }

        loading.push(name.to_string());
        let module = self.register(def, implement, loading);
        loading.pop();
        module
    }

    fn register(
        &mut self,
        def: ModuleDef,
        implement: bool,
        loading: &mut Vec<String>,
    ) -> Result<Arc<Module>> {
        if self.find_module(&def.name).is_some() {
            return self.load_inner(&def.name, implement, loading);
        }
        for import in &def.imports {
            self.load_inner(import, false, loading)?;
        }

        match Module::compile(&def, implement) {
            Ok(module) => {
                let module = Arc::new(module);
                info!(module = %module, implemented = implement, "module loaded");
                self.modules.push(module.clone());
                Ok(module)
            }
            Err(problems) => {
                for (path, message) in problems {
                    self.record(Level::Error, &message, Some(&path), None);
                }
                Err(SchemaError::InvalidModule {
                    name: def.name.clone(),
                    message: self.error_message("cannot load module"),
                })
            }
        }
    }

    /// Find `<name>.yang.json`, or the latest `<name>@<revision>.yang.json`,
    /// in the first search directory holding either.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.search_dirs {
            let exact = dir.join(format!("{name}{MODULE_FILE_EXT}"));
            if exact.is_file() {
                return Some(exact);
            }
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let revision_prefix = format!("{name}@");
            let mut revisions: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.file_name()
                        .and_then(|f| f.to_str())
                        .map_or(false, |f| f.starts_with(&revision_prefix) && f.ends_with(MODULE_FILE_EXT))
                })
                .collect();
            revisions.sort();
            if let Some(latest) = revisions.pop() {
                return Some(latest);
            }
        }
        None
    }

    // ---------------------------------------------------------------
    // Schema lookup
    // ---------------------------------------------------------------

    /// Resolve a path expression against the schema tree.
    ///
    /// Predicates are ignored; `*` matches every child. The first step must
    /// carry a module prefix. An empty result is an error.
    pub fn find_path(&self, path: &str) -> Result<Vec<Arc<SchemaNode>>> {
        let expr = PathExpr::parse(path)?;
        let found = self.resolve_schema(&expr);
        if found.is_empty() {
            self.record(Level::Error, "schema node not found", Some(path), None);
            return Err(SchemaError::PathNotFound {
                path: path.to_string(),
                message: self.error_message("cannot find path"),
            });
        }
        Ok(found)
    }

    fn resolve_schema(&self, expr: &PathExpr) -> Vec<Arc<SchemaNode>> {
        let Some((first, rest)) = expr.steps.split_first() else {
            return Vec::new();
        };
        let Some(module) = first.prefix.as_deref().and_then(|p| self.find_module_prefix(p)) else {
            return Vec::new();
        };

        let mut current: Vec<Arc<SchemaNode>> = match &first.name {
            StepName::Named(n) => module.child(n).cloned().into_iter().collect(),
            StepName::Wildcard => module.nodes().to_vec(),
        };
        for step in rest {
            if let Some(prefix) = &step.prefix {
                if !module.answers_to(prefix) {
                    return Vec::new();
                }
            }
            current = current
                .iter()
                .flat_map(|node| match &step.name {
                    StepName::Named(n) => node.child(n).cloned().into_iter().collect::<Vec<_>>(),
                    StepName::Wildcard => node.children().to_vec(),
                })
                .collect();
        }
        current
    }

    fn find_module_prefix(&self, prefix: &str) -> Option<&Arc<Module>> {
        self.modules.iter().find(|m| m.answers_to(prefix))
    }

    // ---------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------

    /// Send a record to the sink; error records are also queued until the
    /// next [`error_message`](Self::error_message).
    pub fn record(&self, level: Level, message: &str, path: Option<&str>, app_tag: Option<&str>) {
        self.sink.record(level, message, path);
        if level == Level::Error {
            self.diagnostics.push(Diagnostic {
                level,
                path: path.map(str::to_string),
                message: message.to_string(),
                app_tag: app_tag.map(str::to_string),
            });
        }
    }

    /// Drain the queued records and append them to `msg`.
    ///
    /// The queue is emptied even when nothing is appended, so records from
    /// one failed call never show up in the error of the next one.
    pub fn error_message(&self, msg: impl fmt::Display) -> String {
        let pending = self.diagnostics.drain();
        let mut out = msg.to_string();
        if !pending.is_empty() {
            let joined: Vec<String> = pending.iter().map(ToString::to_string).collect();
            out.push_str(": ");
            out.push_str(&joined.join(" "));
        }
        out
    }

    /// Drain the queued records without formatting them.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    pub fn pending_diagnostics(&self) -> usize {
        self.diagnostics.len()
    }
}

/// Iterator over the implemented modules of a context.
pub struct Modules<'a> {
    ctx: &'a SchemaContext,
    idx: usize,
}

impl<'a> Iterator for Modules<'a> {
    type Item = Arc<Module>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let module = self.ctx.modules.get(self.idx)?;
            self.idx += 1;
            if module.is_implemented() {
                return Some(module.clone());
            }
        }
    }
}

impl<'a> IntoIterator for &'a SchemaContext {
    type Item = Arc<Module>;
    type IntoIter = Modules<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::module::NodeDef;
    use yangtree_types::{LeafType, NodeKind};

    const FIXTURE: &str = "minimal-integrationtest";

    fn testdata() -> ContextConfig {
        ContextConfig::isolated(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata"))
    }

    fn loaded() -> SchemaContext {
        let mut ctx = SchemaContext::new(testdata());
        ctx.load_module(FIXTURE).unwrap();
        ctx
    }

    fn write(dir: &Path, file: &str, text: &str) {
        fs::write(dir.join(file), text).unwrap();
    }

    #[test]
    fn load_fixture_module() {
        let ctx = loaded();
        let module = ctx.get_module(FIXTURE).unwrap();
        assert!(module.is_implemented());
        assert_eq!(module.prefix(), "mi");
        assert_eq!(module.revision(), Some("2019-04-20"));
        assert!(ctx.implemented_module("mi").is_some());
        assert!(ctx.module_by_namespace(module.namespace()).is_some());
    }

    #[test]
    fn imports_are_loaded_but_not_implemented() {
        let ctx = loaded();
        let common = ctx.get_module("minimal-common").unwrap();
        assert!(!common.is_implemented());
        assert!(ctx.implemented_module("minimal-common").is_none());

        let names: Vec<String> = ctx.modules().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec![FIXTURE.to_string()]);
    }

    #[test]
    fn loading_an_import_implements_it() {
        let mut ctx = loaded();
        let common = ctx.load_module("minimal-common").unwrap();
        assert!(common.is_implemented());
        assert_eq!(ctx.modules().count(), 2);
    }

    #[test]
    fn module_iteration_restarts() {
        let ctx = loaded();
        let first: Vec<_> = ctx.modules().map(|m| m.name().to_string()).collect();
        let second: Vec<_> = (&ctx).into_iter().map(|m| m.name().to_string()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn missing_module_drains_diagnostics() {
        let mut ctx = SchemaContext::new(testdata());
        let err = ctx.load_module("no-such-module").unwrap_err();
        assert!(matches!(err, SchemaError::ModuleNotFound { .. }));
        let msg = err.to_string();
        assert!(msg.starts_with("cannot load module: "), "{msg}");
        assert!(msg.contains("\"no-such-module\" not found in search dirs"), "{msg}");
        assert_eq!(ctx.pending_diagnostics(), 0);

        // A second failure reports only its own records.
        let err = ctx.get_module("other").unwrap_err().to_string();
        assert!(!err.contains("no-such-module"), "{err}");
    }

    #[test]
    fn get_module_requires_loading() {
        let ctx = SchemaContext::new(testdata());
        let err = ctx.get_module(FIXTURE).unwrap_err();
        assert!(err.to_string().contains("is not loaded"));
    }

    #[test]
    fn find_path_resolves_schema_nodes() {
        let ctx = loaded();

        let found = ctx.find_path("/minimal-integrationtest:types/str1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind(), NodeKind::Leaf);
        assert_eq!(found[0].schema_path(), "/minimal-integrationtest:types/minimal-integrationtest:str1");

        let by_prefix = ctx.find_path("/mi:types/mi:collection[x='a']/y").unwrap();
        assert_eq!(by_prefix[0].data_path_pattern(), "/minimal-integrationtest:types/collection[x='%s']/y");

        let all = ctx.find_path("/minimal-integrationtest:types/*").unwrap();
        assert_eq!(all.len(), 17);
        assert!(all.iter().any(|n| n.kind() == NodeKind::LeafList));
    }

    #[test]
    fn find_path_miss_is_an_error() {
        let ctx = loaded();
        let err = ctx.find_path("/minimal-integrationtest:types/nope").unwrap_err();
        assert!(matches!(err, SchemaError::PathNotFound { .. }));
        assert!(err.to_string().contains("schema node not found"));
        assert_eq!(ctx.pending_diagnostics(), 0);

        assert!(ctx.find_path("/other:types").is_err());
        assert!(matches!(ctx.find_path("types").unwrap_err(), SchemaError::Type(_)));
    }

    #[test]
    fn invalid_module_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.yang.json", "{not json");
        write(dir.path(), "liar.yang.json", r#"{"name": "someone-else"}"#);

        let mut ctx = SchemaContext::new(ContextConfig::isolated(dir.path().display().to_string()));
        let err = ctx.load_module("broken").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidModule { .. }));

        let err = ctx.load_module("liar").unwrap_err().to_string();
        assert!(err.contains("expected \"liar\""), "{err}");
    }

    #[test]
    fn latest_revision_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "r@2020-01-01.yang.json", r#"{"name": "r", "revision": "2020-01-01"}"#);
        write(dir.path(), "r@2021-06-30.yang.json", r#"{"name": "r", "revision": "2021-06-30"}"#);

        let mut ctx = SchemaContext::new(ContextConfig::isolated(dir.path().display().to_string()));
        let module = ctx.load_module("r").unwrap();
        assert_eq!(module.revision(), Some("2021-06-30"));
        assert_eq!(module.to_string(), "r@2021-06-30");
    }

    #[test]
    fn circular_imports_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yang.json", r#"{"name": "a", "imports": ["b"]}"#);
        write(dir.path(), "b.yang.json", r#"{"name": "b", "imports": ["a"]}"#);

        let mut ctx = SchemaContext::new(ContextConfig::isolated(dir.path().display().to_string()));
        let err = ctx.load_module("a").unwrap_err().to_string();
        assert!(err.contains("circular import of \"a\""), "{err}");
    }

    #[test]
    fn add_module_in_code() {
        let mut ctx = SchemaContext::new(testdata());
        let mut def = ModuleDef::new("extra", vec![NodeDef::leaf("flag", LeafType::Boolean)]);
        def.imports.push("minimal-common".into());

        let module = ctx.add_module(def).unwrap();
        assert!(module.is_implemented());
        assert!(!ctx.get_module("minimal-common").unwrap().is_implemented());
        assert_eq!(ctx.find_path("/extra:flag").unwrap().len(), 1);
    }

    #[test]
    fn sink_receives_records() {
        let sink = Arc::new(MemorySink::new());
        let mut ctx = SchemaContext::with_sink(testdata(), sink.clone());
        assert!(ctx.load_module("missing").is_err());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Level::Error);

        // Non-error records reach the sink but are not queued.
        ctx.record(Level::Warning, "just saying", None, None);
        assert_eq!(sink.len(), 2);
        assert_eq!(ctx.pending_diagnostics(), 0);
    }

    #[test]
    fn error_message_formats_records() {
        let ctx = SchemaContext::new(testdata());
        ctx.record(Level::Error, "Missing required element", Some("/m:v/x"), Some("missing-element"));
        ctx.record(Level::Error, "second", None, None);
        assert_eq!(
            ctx.error_message("validation failed"),
            "validation failed: /m:v/x: Missing required element: missing-element second"
        );
        assert_eq!(ctx.error_message("again"), "again");
    }

    #[test]
    fn add_search_dir_checks_directory() {
        let mut ctx = SchemaContext::new(ContextConfig::isolated(""));
        assert!(ctx.search_dirs().is_empty());
        assert!(matches!(
            ctx.add_search_dir("/definitely/not/here"),
            Err(SchemaError::InvalidSearchDir(_))
        ));
        ctx.add_search_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata")).unwrap();
        ctx.add_search_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata")).unwrap();
        assert_eq!(ctx.search_dirs().len(), 1);
        assert!(ctx.load_module(FIXTURE).is_ok());
    }
}
