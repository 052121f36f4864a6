//! Removal of replace directives no dependency edge justifies

use crate::config::RunConfig;
use crate::discovery::{Module, ModuleSet};
use crate::graph::DependencyGraph;
use crate::log::Logger;
use crate::manifest::Manifest;

/// Drop unjustified intra-repository replaces from `manifest`
///
/// A replace is pruned when its target lies in the repository namespace, is
/// not excluded, and is not among the module's transitive dependencies.
/// Replaces of external modules are never touched. Returns the pruned
/// targets in the order they appeared.
pub fn prune_manifest(
    module: &Module,
    manifest: &mut Manifest,
    modules: &ModuleSet,
    graph: &DependencyGraph,
    config: &RunConfig,
    log: Logger<'_>,
) -> Vec<String> {
    let justified = graph.transitive_dependencies(&module.identity);

    let mut stale: Vec<String> = Vec::new();
    for replace in manifest.replaces() {
        let target = &replace.old_path;
        if stale.contains(target)
            || !modules.in_namespace(target)
            || config.is_excluded(target)
            || justified.contains(target)
        {
            continue;
        }
        stale.push(target.clone());
    }

    for target in &stale {
        log.debug(format!("{}: pruning replace {target}", module.identity));
        manifest.drop_replace(target);
    }

    stale
}
