//! Run configuration
//!
//! Load order: optional TOML file, then CLI flags layered on top by the
//! caller, then the defaults below for anything left unset.

use crate::error::{CrosslinkError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Options for a single crosslink or prune run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Repository root. Must contain a `go.mod`.
    pub root_path: PathBuf,
    /// Replace existing local overrides whose path is stale.
    pub overwrite: bool,
    /// Remove overrides no dependency edge justifies during `crosslink`.
    pub prune: bool,
    /// Module identities kept out of the dependency graph.
    pub excluded_paths: BTreeSet<String>,
    /// Root-relative manifest paths or globs (e.g. `testA/go.mod`) that are
    /// never rewritten.
    pub skipped_paths: BTreeSet<String>,
    /// Emit debug diagnostics.
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            overwrite: false,
            prune: false,
            excluded_paths: BTreeSet::new(),
            skipped_paths: BTreeSet::new(),
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Defaults for the given repository root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CrosslinkError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CrosslinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn is_excluded(&self, identity: &str) -> bool {
        self.excluded_paths.contains(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.root_path, PathBuf::from("."));
        assert!(!config.overwrite);
        assert!(!config.prune);
        assert!(!config.verbose);
        assert!(config.excluded_paths.is_empty());
        assert!(config.skipped_paths.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml_str(
            r#"
root_path = "repo"
prune = true
excluded_paths = ["example.com/root/testB"]
"#,
        )
        .unwrap();

        assert_eq!(config.root_path, PathBuf::from("repo"));
        assert!(config.prune);
        assert!(!config.overwrite);
        assert!(config.is_excluded("example.com/root/testB"));
        assert!(config.skipped_paths.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("crosslink.toml");
        fs::write(&path, "overwrite = true\nskipped_paths = [\"testA/go.mod\"]\n").unwrap();

        let config = RunConfig::load(&path).unwrap();

        assert!(config.overwrite);
        assert!(config.skipped_paths.contains("testA/go.mod"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RunConfig::from_toml_str("prune = \"yes\"").unwrap_err();
        assert!(matches!(err, CrosslinkError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = RunConfig::load(&temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CrosslinkError::Io { .. }));
    }
}
