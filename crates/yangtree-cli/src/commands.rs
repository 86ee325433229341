use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use tracing::debug;
use yangtree_data::{DataNode, DataTree, Format, MergeOptions};
use yangtree_diff::{ChangeKind, Differ};
use yangtree_schema::SchemaContext;
use yangtree_types::Value;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(&cli.config)?.apply(&cli);
    let session = Session::open(&config)?;
    match cli.command {
        Command::Modules => cmd_modules(&session),
        Command::Schema(args) => cmd_schema(&session, args),
        Command::Get(args) => cmd_get(&session, args),
        Command::Set(args) => cmd_set(&session, args),
        Command::Delete(args) => cmd_delete(&session, args),
        Command::Merge(args) => cmd_merge(&session, args),
        Command::Validate(args) => cmd_validate(&session, args),
        Command::Convert(args) => cmd_convert(&session, args),
        Command::Diff(args) => cmd_diff(&session, args),
        Command::Nodes(args) => cmd_nodes(&session, args),
    }
}

/// A loaded schema context plus the format policy for data files.
struct Session {
    ctx: Arc<SchemaContext>,
    format: Option<Format>,
}

impl Session {
    fn open(config: &CliConfig) -> anyhow::Result<Self> {
        if config.modules.is_empty() {
            bail!("no modules to load; pass --module or list them in the config file");
        }
        let mut ctx = SchemaContext::new(config.context_config());
        for name in &config.modules {
            ctx.load_module(name)
                .with_context(|| format!("loading module {name}"))?;
        }
        debug!(modules = config.modules.len(), "schema context ready");
        Ok(Self {
            ctx: Arc::new(ctx),
            format: config.format,
        })
    }

    /// An explicit format wins, then the file extension, then XML.
    fn format_of(&self, file: &Path) -> Format {
        self.format
            .or_else(|| Format::from_extension(file))
            .unwrap_or_default()
    }

    fn load(&self, file: &Path) -> anyhow::Result<DataTree> {
        let mut tree = DataTree::new(self.ctx.clone());
        tree.load(file, self.format_of(file))
            .with_context(|| format!("loading {}", file.display()))?;
        Ok(tree)
    }

    fn load_or_empty(&self, file: &Path) -> anyhow::Result<DataTree> {
        if file.exists() {
            self.load(file)
        } else {
            Ok(DataTree::new(self.ctx.clone()))
        }
    }

    fn save(&self, tree: &DataTree, file: &Path) -> anyhow::Result<()> {
        tree.dump(file, self.format_of(file))
            .with_context(|| format!("writing {}", file.display()))?;
        println!("{} Wrote {}", "✓".green().bold(), file.display());
        Ok(())
    }
}

fn target(output: Option<PathBuf>, input: &Path) -> PathBuf {
    output.unwrap_or_else(|| input.to_path_buf())
}

fn print_node(node: &DataNode<'_>, indent: usize) {
    let pad = "  ".repeat(indent);
    if node.kind().map_or(false, |k| k.is_terminal()) {
        println!("{pad}{} = {}", node.path().bold(), node.value().to_string().cyan());
    } else {
        println!("{pad}{}", node.path().bold());
    }
}

fn cmd_modules(session: &Session) -> anyhow::Result<()> {
    for module in session.ctx.modules() {
        println!(
            "{}  prefix {}  {}",
            module.to_string().bold(),
            module.prefix().cyan(),
            module.namespace().dimmed()
        );
    }
    Ok(())
}

fn cmd_schema(session: &Session, args: SchemaArgs) -> anyhow::Result<()> {
    for node in session.ctx.find_path(&args.path)? {
        let ty = node.leaf_type().map(|t| format!(" {t}")).unwrap_or_default();
        println!("{} ({}{})", node.schema_path().bold(), node.kind(), ty);
        println!("  data path: {}", node.data_path_pattern().dimmed());
        if !node.keys().is_empty() {
            println!("  keys: {}", node.keys().join(", ").yellow());
        }
        if let Some(default) = node.default_value() {
            println!("  default: {}", default.cyan());
        }
        if node.is_mandatory() {
            println!("  {}", "mandatory".red());
        }
        if node.is_presence() {
            println!("  presence");
        }
        if node.min_elements() > 0 {
            println!("  min-elements: {}", node.min_elements());
        }
    }
    Ok(())
}

fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let tree = session.load(&args.file)?;
    let nodes = tree.get(&args.path)?;
    if nodes.is_empty() {
        println!("No matches.");
    }
    for node in &nodes {
        print_node(node, 0);
    }
    Ok(())
}

fn cmd_set(session: &Session, args: SetArgs) -> anyhow::Result<()> {
    let mut tree = session.load_or_empty(&args.file)?;
    tree.set(&args.path, Value::from(args.value))?;
    session.save(&tree, &target(args.output, &args.file))
}

fn cmd_delete(session: &Session, args: DeleteArgs) -> anyhow::Result<()> {
    let mut tree = session.load(&args.file)?;
    tree.delete(&args.path)?;
    session.save(&tree, &target(args.output, &args.file))
}

fn cmd_merge(session: &Session, args: MergeArgs) -> anyhow::Result<()> {
    let mut tree = session.load_or_empty(&args.base)?;
    let patch = fs::read_to_string(&args.patch)
        .with_context(|| format!("reading {}", args.patch.display()))?;
    let options = MergeOptions {
        strict: !args.lax,
        trusted: args.trusted,
    };
    tree.merge(&patch, session.format_of(&args.patch), options)?;
    session.save(&tree, &target(args.output, &args.base))
}

fn cmd_validate(session: &Session, args: FileArgs) -> anyhow::Result<()> {
    let tree = session.load(&args.file)?;
    tree.validate()?;
    println!(
        "{} {} is valid ({} nodes)",
        "✓".green().bold(),
        args.file.display(),
        tree.len()
    );
    Ok(())
}

fn cmd_convert(session: &Session, args: ConvertArgs) -> anyhow::Result<()> {
    let tree = session.load(&args.file)?;
    let text = tree.dumps(args.to.into())?;
    match args.output {
        Some(out) => {
            fs::write(&out, text).with_context(|| format!("writing {}", out.display()))?;
            println!("{} Wrote {}", "✓".green().bold(), out.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_diff(session: &Session, args: DiffArgs) -> anyhow::Result<()> {
    let a = session.load(&args.a)?;
    let b = session.load(&args.b)?;
    let diff = Differ::new(session.ctx.clone()).diff(&a, &b)?;
    if diff.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for record in &diff {
        let line = match record.kind {
            ChangeKind::Created => record.to_string().green(),
            ChangeKind::Modified => record.to_string().yellow(),
            ChangeKind::Removed => record.to_string().red(),
        };
        println!("{line}");
    }
    println!(
        "{} modified, {} removed, {} created",
        diff.modifications(),
        diff.removals(),
        diff.additions()
    );
    Ok(())
}

fn cmd_nodes(session: &Session, args: FileArgs) -> anyhow::Result<()> {
    let tree = session.load(&args.file)?;
    for node in tree.datanodes() {
        let depth = node.path().matches('/').count().saturating_sub(1);
        print_node(&node, depth);
    }
    Ok(())
}
