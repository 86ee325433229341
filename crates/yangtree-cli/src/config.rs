use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use yangtree_data::Format;
use yangtree_schema::ContextConfig;

use crate::cli::Cli;

/// Settings read from `yangtree.toml`; command-line flags take precedence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CliConfig {
    pub search_path: Option<String>,
    pub modules: Vec<String>,
    pub format: Option<Format>,
}

impl CliConfig {
    /// Read `path` if it exists, otherwise the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn apply(mut self, cli: &Cli) -> Self {
        if cli.search_path.is_some() {
            self.search_path = cli.search_path.clone();
        }
        if !cli.modules.is_empty() {
            self.modules = cli.modules.clone();
        }
        if let Some(format) = cli.format {
            self.format = Some(format.into());
        }
        self
    }

    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            search_path: self.search_path.clone(),
            search_cwd: true,
            ..ContextConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_file_gives_defaults() {
        let c = CliConfig::load(Path::new("/definitely/not/yangtree.toml")).unwrap();
        assert_eq!(c, CliConfig::default());
        assert!(c.modules.is_empty());
    }

    #[test]
    fn parse_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yangtree.toml");
        fs::write(
            &path,
            "search-path = \"/opt/yang\"\nmodules = [\"a\", \"b\"]\nformat = \"json\"\n",
        )
        .unwrap();
        let c = CliConfig::load(&path).unwrap();
        assert_eq!(c.search_path.as_deref(), Some("/opt/yang"));
        assert_eq!(c.modules, vec!["a", "b"]);
        assert_eq!(c.format, Some(Format::Json));

        fs::write(&path, "modules = 3").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }

    #[test]
    fn flags_override_file() {
        let file = CliConfig {
            search_path: Some("/from/file".into()),
            modules: vec!["file-module".into()],
            format: Some(Format::Xml),
        };
        let cli = Cli::try_parse_from(["yangtree", "-m", "flag-module", "--format", "json", "modules"]).unwrap();
        let c = file.apply(&cli);
        assert_eq!(c.search_path.as_deref(), Some("/from/file"));
        assert_eq!(c.modules, vec!["flag-module"]);
        assert_eq!(c.format, Some(Format::Json));
        assert_eq!(c.context_config().search_path.as_deref(), Some("/from/file"));
    }
}
