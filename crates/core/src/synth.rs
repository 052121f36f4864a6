//! Replace-directive synthesis
//!
//! Computes, for one module, the local `replace` directives that make every
//! intra-repository dependency resolve to the checkout on disk.

use crate::config::RunConfig;
use crate::discovery::{Module, ModuleSet};
use crate::graph::DependencyGraph;
use std::collections::BTreeMap;

/// Why a directive was synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Target is in the module's transitive closure
    Graph,
    /// Target is excluded from the graph but required directly and present
    /// on disk; an existing override for it is never touched
    ExcludedRequirement,
}

/// A local override `replace <target> => <path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub target: String,
    /// Path from the module's directory to the target's directory
    pub path: String,
    pub origin: Origin,
}

/// Directives for `module`, sorted by target identity
pub fn synthesize(
    module: &Module,
    modules: &ModuleSet,
    graph: &DependencyGraph,
    config: &RunConfig,
) -> Vec<Directive> {
    let mut directives: BTreeMap<String, Directive> = BTreeMap::new();

    for target in graph.transitive_dependencies(&module.identity) {
        if target == module.identity || config.is_excluded(&target) {
            continue;
        }
        let Some(dep) = modules.get(&target) else {
            continue;
        };
        if dep.skipped {
            continue;
        }
        directives.insert(
            target.clone(),
            Directive {
                path: relative_path(&module.rel_dir, &dep.rel_dir),
                target,
                origin: Origin::Graph,
            },
        );
    }

    // Excluded modules only get an override when required directly and
    // located under the root; external references are left alone.
    for require in module.manifest.requires() {
        if require.path == module.identity || !config.is_excluded(&require.path) {
            continue;
        }
        let Some(dep) = modules.get(&require.path) else {
            continue;
        };
        if dep.skipped {
            continue;
        }
        directives.entry(require.path.clone()).or_insert_with(|| Directive {
            target: require.path.clone(),
            path: relative_path(&module.rel_dir, &dep.rel_dir),
            origin: Origin::ExcludedRequirement,
        });
    }

    directives.into_values().collect()
}

/// Relative replace path between two root-relative, `/`-separated directories
///
/// Paths leaving the module directory start with `..`; a bare parent is
/// written `../`. Everything else gets a `./` prefix.
pub fn relative_path(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    let rel = parts.join("/");

    if rel.is_empty() {
        "./".to_string()
    } else if rel == ".." {
        "../".to_string()
    } else if rel.starts_with("..") {
        rel
    } else {
        format!("./{rel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_child() {
        assert_eq!(relative_path("", "testA"), "./testA");
        assert_eq!(relative_path("", "nested/testB"), "./nested/testB");
    }

    #[test]
    fn test_relative_path_sibling() {
        assert_eq!(relative_path("testA", "testB"), "../testB");
        assert_eq!(relative_path("x/a", "y/b"), "../../y/b");
    }

    #[test]
    fn test_relative_path_parent() {
        assert_eq!(relative_path("testA", ""), "../");
        assert_eq!(relative_path("a/b", ""), "../..");
    }

    #[test]
    fn test_relative_path_shared_prefix() {
        assert_eq!(relative_path("a/b", "a/c"), "../c");
        assert_eq!(relative_path("a", "a/b"), "./b");
        assert_eq!(relative_path("a", "a"), "./");
    }
}
