use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use yangtree_data::Format;

#[derive(Parser)]
#[command(
    name = "yangtree",
    about = "yangtree: load, edit, merge, validate and diff YANG instance data",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Payload format; guessed from the file extension when omitted
    #[arg(long, global = true)]
    pub format: Option<DataFormat>,

    /// Colon-separated directories holding compiled modules
    #[arg(long, global = true)]
    pub search_path: Option<String>,

    /// Module to load and implement (repeatable)
    #[arg(short = 'm', long = "module", global = true)]
    pub modules: Vec<String>,

    /// TOML configuration file, read when present
    #[arg(long, global = true, default_value = "yangtree.toml")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DataFormat {
    Xml,
    Json,
}

impl From<DataFormat> for Format {
    fn from(f: DataFormat) -> Self {
        match f {
            DataFormat::Xml => Format::Xml,
            DataFormat::Json => Format::Json,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// List the implemented modules
    Modules,
    /// Describe the schema nodes matching a path
    Schema(SchemaArgs),
    /// Print the nodes matching a path
    Get(GetArgs),
    /// Create or update a node
    Set(SetArgs),
    /// Delete the single node a path resolves to
    Delete(DeleteArgs),
    /// Merge a partial document into a data file
    Merge(MergeArgs),
    /// Validate a data file against the schema
    Validate(FileArgs),
    /// Re-encode a data file as XML or JSON
    Convert(ConvertArgs),
    /// Show leaf-level changes between two data files
    Diff(DiffArgs),
    /// List every node of a data file, ordered by path
    Nodes(FileArgs),
}

#[derive(Args)]
pub struct SchemaArgs {
    pub path: String,
}

#[derive(Args)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub file: PathBuf,
    pub path: String,
}

#[derive(Args)]
pub struct SetArgs {
    /// Data file; a missing file starts from an empty tree
    pub file: PathBuf,
    pub path: String,
    /// New value; omit for containers, list entries and empty leaves
    pub value: Option<String>,
    /// Write the result here instead of back to the input file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub file: PathBuf,
    pub path: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct MergeArgs {
    pub base: PathBuf,
    pub patch: PathBuf,
    /// Skip validation of the merged result
    #[arg(long)]
    pub trusted: bool,
    /// Skip elements unknown to the schema instead of failing
    #[arg(long)]
    pub lax: bool,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConvertArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub to: DataFormat,
    /// Write the result here instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub a: PathBuf,
    pub b: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modules() {
        let cli = Cli::try_parse_from(["yangtree", "modules"]).unwrap();
        assert!(matches!(cli.command, Command::Modules));
        assert_eq!(cli.config, PathBuf::from("yangtree.toml"));
        assert!(cli.format.is_none());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "yangtree",
            "--search-path",
            "/a:/b",
            "-m",
            "one",
            "--module",
            "two",
            "--format",
            "json",
            "-v",
            "validate",
            "data.json",
        ])
        .unwrap();
        assert_eq!(cli.search_path.as_deref(), Some("/a:/b"));
        assert_eq!(cli.modules, vec!["one", "two"]);
        assert_eq!(cli.format, Some(DataFormat::Json));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Validate(_)));
    }

    #[test]
    fn parse_set_without_value() {
        let cli = Cli::try_parse_from(["yangtree", "set", "d.xml", "/m:c/l[k='a']"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.path, "/m:c/l[k='a']");
            assert!(args.value.is_none());
            assert!(args.output.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_merge_flags() {
        let cli = Cli::try_parse_from(["yangtree", "merge", "base.xml", "patch.xml", "--trusted", "--lax", "-o", "out.xml"])
            .unwrap();
        if let Command::Merge(args) = cli.command {
            assert!(args.trusted && args.lax);
            assert_eq!(args.output, Some(PathBuf::from("out.xml")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_convert_requires_target() {
        assert!(Cli::try_parse_from(["yangtree", "convert", "d.xml"]).is_err());
        let cli = Cli::try_parse_from(["yangtree", "convert", "d.xml", "--to", "json"]).unwrap();
        if let Command::Convert(args) = cli.command {
            assert_eq!(Format::from(args.to), Format::Json);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from(["yangtree", "diff", "a.json", "b.json"]).unwrap();
        assert!(matches!(cli.command, Command::Diff(_)));
    }
}
