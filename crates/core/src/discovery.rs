//! Module discovery with gitignore-aware traversal
//!
//! Walks the repository root, parses every `go.mod` it finds and returns the
//! set of modules keyed by identity. Manifests matching a skip pattern are
//! still read (they take part in the dependency graph) but are flagged so
//! that no later stage rewrites them.

use crate::config::RunConfig;
use crate::error::{CrosslinkError, Result};
use crate::log::Logger;
use crate::manifest::Manifest;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of a module manifest
pub const MANIFEST_FILE: &str = "go.mod";

/// A module located in the repository
#[derive(Debug, Clone)]
pub struct Module {
    /// Module path declared by the manifest
    pub identity: String,
    /// Absolute module directory
    pub dir: PathBuf,
    /// Directory relative to the root, `/`-separated; empty for the root module
    pub rel_dir: String,
    /// Absolute manifest path
    pub manifest_path: PathBuf,
    /// Manifest path relative to the root, `/`-separated (e.g. `testA/go.mod`)
    pub rel_manifest_path: String,
    pub manifest: Manifest,
    /// Manifest text exactly as read
    pub original: String,
    /// Matched a skip pattern; never rewritten
    pub skipped: bool,
}

/// Every module under a repository root
#[derive(Debug, Clone)]
pub struct ModuleSet {
    /// Canonical repository root
    pub root: PathBuf,
    /// Identity declared by the root `go.mod`
    pub root_identity: String,
    /// Modules keyed by identity
    pub modules: BTreeMap<String, Module>,
}

impl ModuleSet {
    pub fn get(&self, identity: &str) -> Option<&Module> {
        self.modules.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.modules.contains_key(identity)
    }

    pub(crate) fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether `identity` lives in the repository's module namespace
    ///
    /// True for located modules and for any path under the root identity,
    /// whether or not it still exists on disk.
    pub fn in_namespace(&self, identity: &str) -> bool {
        self.contains(identity)
            || identity == self.root_identity
            || identity
                .strip_prefix(self.root_identity.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Locate and parse every module manifest under `config.root_path`
///
/// # Errors
/// - `RootInvalid` when the root has no `go.mod`
/// - `InvalidPattern` when a skip pattern is not a valid glob
/// - `Io` / `Parse` when a manifest cannot be read or parsed
/// - `DuplicateModule` when two manifests declare the same identity
pub fn locate_modules(config: &RunConfig, log: Logger<'_>) -> Result<ModuleSet> {
    let root_manifest = config.root_path.join(MANIFEST_FILE);
    if !root_manifest.is_file() {
        return Err(CrosslinkError::RootInvalid {
            root: config.root_path.clone(),
        });
    }

    let root = config
        .root_path
        .canonicalize()
        .map_err(|source| CrosslinkError::Io {
            path: config.root_path.clone(),
            source,
        })?;

    let skip_matcher = build_skip_matcher(&config.skipped_paths)?;

    let mut modules: BTreeMap<String, Module> = BTreeMap::new();
    let mut root_identity = None;

    for path in discover_manifests(&root)? {
        let rel_manifest_path = relative_slash_path(&root, &path);
        let text = std::fs::read_to_string(&path).map_err(|source| CrosslinkError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest = Manifest::parse(&path, &text)?;
        let identity = manifest.module().to_string();

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
        let rel_dir = relative_slash_path(&root, &dir);
        if rel_dir.is_empty() {
            root_identity = Some(identity.clone());
        }

        let skipped = skip_matcher.is_match(&rel_manifest_path);
        if skipped {
            log.debug(format!("skipping {rel_manifest_path}: matches a skip pattern"));
        }

        if let Some(existing) = modules.get(&identity) {
            return Err(CrosslinkError::DuplicateModule {
                identity,
                first: existing.manifest_path.clone(),
                second: path,
            });
        }

        log.debug(format!("located module {identity} at {rel_manifest_path}"));
        modules.insert(
            identity.clone(),
            Module {
                identity,
                dir,
                rel_dir,
                manifest_path: path,
                rel_manifest_path,
                manifest,
                original: text,
                skipped,
            },
        );
    }

    // The walker always yields the root manifest checked above
    let root_identity = root_identity.ok_or_else(|| CrosslinkError::RootInvalid {
        root: config.root_path.clone(),
    })?;

    Ok(ModuleSet {
        root,
        root_identity,
        modules,
    })
}

/// Absolute paths of every `go.mod` under `root`, sorted
fn discover_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for result in build_walker(root) {
        let entry = result.map_err(|err| CrosslinkError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::other(err.to_string()),
        })?;
        let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
        if is_file && entry.file_name() == MANIFEST_FILE {
            files.push(entry.into_path());
        }
    }

    // Sort for deterministic processing order
    files.sort();
    Ok(files)
}

/// Build a glob matcher from the configured skip patterns
fn build_skip_matcher<'a>(patterns: impl IntoIterator<Item = &'a String>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let normalized = pattern.strip_prefix("./").unwrap_or(pattern);
        let glob = Glob::new(normalized).map_err(|source| CrosslinkError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| CrosslinkError::InvalidPattern {
        pattern: String::new(),
        source,
    })
}

/// Build a WalkBuilder with proper ignore configuration
fn build_walker(root: &Path) -> ignore::Walk {
    let mut builder = WalkBuilder::new(root);
    builder
        .git_ignore(true)
        .git_exclude(true)
        .hidden(false)
        .parents(false)
        .filter_entry(|entry| entry.file_name() != ".git");

    builder.build()
}

/// `path` relative to `root` with `/` separators; empty when equal
fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
