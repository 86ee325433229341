use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::diagnostics::Level;

/// Primary environment variable holding a colon-separated search path.
pub const YANGPATH_ENV: &str = "YANGPATH";
/// Fallback consulted when [`YANGPATH_ENV`] is not set.
pub const YANG_MODPATH_ENV: &str = "YANG_MODPATH";

const TRIM_CHARS: &[char] = &[':', ' ', '\t', '\r', '\n', '\'', '"'];

/// Configuration for a [`SchemaContext`](crate::SchemaContext).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContextConfig {
    /// Colon-separated directories searched after the environment ones.
    pub search_path: Option<String>,
    /// Whether `YANGPATH` / `YANG_MODPATH` are consulted.
    pub use_env: bool,
    /// Whether the current directory is searched last.
    pub search_cwd: bool,
    /// Least severe level forwarded by the default tracing sink.
    pub log_level: Level,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            search_path: None,
            use_env: true,
            search_cwd: false,
            log_level: Level::Error,
        }
    }
}

impl ContextConfig {
    /// Default configuration with an explicit search path.
    pub fn with_search_path(path: impl Into<String>) -> Self {
        Self {
            search_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Configuration that ignores the environment entirely.
    pub fn isolated(path: impl Into<String>) -> Self {
        Self {
            search_path: Some(path.into()),
            use_env: false,
            ..Default::default()
        }
    }
}

/// Split a colon-separated search path after trimming surrounding colons,
/// quotes and whitespace.
pub fn split_search_path(raw: &str) -> Vec<PathBuf> {
    raw.trim_matches(TRIM_CHARS)
        .split(':')
        .map(|s| s.trim_matches(TRIM_CHARS))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Resolve the ordered list of existing search directories.
///
/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
/// for the process environment. Candidates that are not directories are
/// skipped, duplicates keep their first position.
pub fn resolve_search_dirs<F>(config: &ContextConfig, env: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut candidates = Vec::new();
    if config.use_env {
        if let Some(raw) = env(YANGPATH_ENV).or_else(|| env(YANG_MODPATH_ENV)) {
            candidates.extend(split_search_path(&raw));
        }
    }
    if let Some(raw) = &config.search_path {
        candidates.extend(split_search_path(raw));
    }
    if config.search_cwd {
        candidates.push(PathBuf::from("."));
    }

    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "search dir does not exist; skipping");
            continue;
        }
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ContextConfig::default();
        assert!(c.use_env);
        assert!(!c.search_cwd);
        assert!(c.search_path.is_none());
        assert_eq!(c.log_level, Level::Error);
    }

    #[test]
    fn split_trims_quotes_and_colons() {
        let dirs = split_search_path(" ':/a:/b::/c:' \n");
        assert_eq!(dirs, vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]);
        assert!(split_search_path("\"\"").is_empty());
    }

    #[test]
    fn env_precedence_and_missing_dirs() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        let three = tempfile::tempdir().unwrap();
        let p = |d: &tempfile::TempDir| d.path().display().to_string();

        let config = ContextConfig::with_search_path(format!("{}:/does/not/exist", p(&three)));
        let yangpath = format!("'{}'", p(&one));
        let modpath = p(&two);
        let env = |k: &str| match k {
            YANGPATH_ENV => Some(yangpath.clone()),
            YANG_MODPATH_ENV => Some(modpath.clone()),
            _ => None,
        };

        let dirs = resolve_search_dirs(&config, env);
        assert_eq!(dirs, vec![one.path().to_path_buf(), three.path().to_path_buf()]);
    }

    #[test]
    fn modpath_used_when_yangpath_absent() {
        let two = tempfile::tempdir().unwrap();
        let modpath = two.path().display().to_string();
        let env = |k: &str| (k == YANG_MODPATH_ENV).then(|| modpath.clone());

        let dirs = resolve_search_dirs(&ContextConfig::default(), env);
        assert_eq!(dirs, vec![two.path().to_path_buf()]);
    }

    #[test]
    fn isolated_ignores_env() {
        let one = tempfile::tempdir().unwrap();
        let config = ContextConfig::isolated("");
        let yangpath = one.path().display().to_string();
        let dirs = resolve_search_dirs(&config, |_| Some(yangpath.clone()));
        assert!(dirs.is_empty());
    }

    #[test]
    fn serde_kebab_case() {
        let c: ContextConfig = serde_json::from_str(r#"{"search-path": "/x", "use-env": false}"#).unwrap();
        assert_eq!(c.search_path.as_deref(), Some("/x"));
        assert!(!c.use_env);
        assert_eq!(c.log_level, Level::Error);
    }
}
