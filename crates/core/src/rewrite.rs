//! Merging synthesized directives into a manifest and persisting it

use crate::error::{CrosslinkError, Result};
use crate::log::Logger;
use crate::manifest::Manifest;
use crate::synth::{Directive, Origin};
use std::io::Write;
use std::path::Path;

/// What happened to each directive applied to one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Appended because no replace existed
    pub added: Vec<String>,
    /// Existing replace repointed (overwrite enabled)
    pub updated: Vec<String>,
    /// Existing replace left alone although it differs
    pub kept: Vec<String>,
}

impl RewriteOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.kept.is_empty()
    }
}

/// Merge `directives` into `manifest`
///
/// - No replace for the target: the directive is appended.
/// - A replace already points at the directive path: nothing to do.
/// - A differing replace exists: it is repointed when `overwrite` is set and
///   the directive comes from the graph, and kept otherwise.
pub fn apply_directives(
    manifest: &mut Manifest,
    directives: &[Directive],
    overwrite: bool,
    log: Logger<'_>,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();
    let module = manifest.module().to_string();

    for directive in directives {
        let existing = manifest
            .replace_for(&directive.target)
            .map(|r| (r.new_path.clone(), r.new_version.is_none()));

        match existing {
            None => {
                log.debug(format!("{module}: adding replace {} => {}", directive.target, directive.path));
                manifest.add_replace(&directive.target, &directive.path);
                outcome.added.push(directive.target.clone());
            }
            Some((path, unversioned)) if unversioned && path == directive.path => {}
            Some((path, _)) if overwrite && directive.origin == Origin::Graph => {
                log.debug(format!(
                    "{module}: overwriting replace {} => {path} with {}",
                    directive.target, directive.path
                ));
                manifest.set_replace_path(&directive.target, &directive.path);
                outcome.updated.push(directive.target.clone());
            }
            Some((path, _)) => {
                log.warn(format!(
                    "{module}: keeping existing replace {} => {path} (computed {})",
                    directive.target, directive.path
                ));
                outcome.kept.push(directive.target.clone());
            }
        }
    }

    outcome
}

/// Replace `path` with `content` atomically
///
/// The content is written to a temporary file in the same directory and
/// renamed over the target, so on failure the original stays intact.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let write_err = |source: std::io::Error| CrosslinkError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_err)?;
    }
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{Level, MemorySink};
    use std::fs;
    use tempfile::TempDir;

    fn directive(target: &str, path: &str) -> Directive {
        Directive {
            target: target.to_string(),
            path: path.to_string(),
            origin: Origin::Graph,
        }
    }

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(Path::new("go.mod"), text).unwrap()
    }

    #[test]
    fn test_appends_missing_directives() {
        let sink = MemorySink::new();
        let mut m = manifest("module m\n\ngo 1.20\n");

        let outcome = apply_directives(
            &mut m,
            &[directive("m/a", "./a"), directive("m/b", "./b")],
            false,
            Logger::new(&sink, false),
        );

        assert_eq!(outcome.added, vec!["m/a".to_string(), "m/b".to_string()]);
        assert_eq!(m.render(), "module m\n\ngo 1.20\n\nreplace m/a => ./a\nreplace m/b => ./b\n");
    }

    #[test]
    fn test_stale_replace_kept_without_overwrite() {
        let sink = MemorySink::new();
        let original = "module m\n\nreplace m/a => ../a\n";
        let mut m = manifest(original);

        let outcome = apply_directives(&mut m, &[directive("m/a", "./a")], false, Logger::new(&sink, false));

        assert_eq!(outcome.kept, vec!["m/a".to_string()]);
        assert_eq!(m.render(), original);
        assert_eq!(sink.messages(Level::Warn).len(), 1);
    }

    #[test]
    fn test_stale_replace_updated_with_overwrite() {
        let sink = MemorySink::new();
        let mut m = manifest("module m\n\nreplace m/a => ../a\n");

        let outcome = apply_directives(&mut m, &[directive("m/a", "./a")], true, Logger::new(&sink, false));

        assert_eq!(outcome.updated, vec!["m/a".to_string()]);
        assert_eq!(m.render(), "module m\n\nreplace m/a => ./a\n");
    }

    #[test]
    fn test_excluded_requirement_never_overwritten() {
        let sink = MemorySink::new();
        let original = "module m\n\nreplace m/a => ../a\n";
        let mut m = manifest(original);
        let d = Directive {
            origin: Origin::ExcludedRequirement,
            ..directive("m/a", "./a")
        };

        let outcome = apply_directives(&mut m, &[d], true, Logger::new(&sink, false));

        assert_eq!(outcome.kept, vec!["m/a".to_string()]);
        assert_eq!(m.render(), original);
    }

    #[test]
    fn test_matching_replace_is_noop() {
        let sink = MemorySink::new();
        let mut m = manifest("module m\n\nreplace m/a => ./a\n");

        let outcome = apply_directives(&mut m, &[directive("m/a", "./a")], true, Logger::new(&sink, false));

        assert!(outcome.is_empty());
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("go.mod");
        fs::write(&path, "module old\n").unwrap();

        write_atomic(&path, "module new\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "module new\n");
        // no temp files left behind
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_dir_is_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent").join("go.mod");

        let err = write_atomic(&path, "module m\n").unwrap_err();

        assert!(matches!(err, CrosslinkError::Write { .. }));
    }

    #[test]
    fn test_write_atomic_failed_persist_leaves_target_intact() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("go.mod");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let err = write_atomic(&target, "module m\n").unwrap_err();

        assert!(matches!(err, CrosslinkError::Write { .. }));
        assert_eq!(fs::read_to_string(target.join("keep")).unwrap(), "x");
        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("go.mod")]);
    }
}
