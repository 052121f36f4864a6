//! Crosslink Core Library
//!
//! Keeps the `replace` directives of a multi-module Go repository in sync
//! with its intra-repository dependency graph: every module gets a local
//! override for each repository module it depends on, directly or
//! transitively, and overrides nothing justifies can be pruned.
//!
//! A run moves through `Located -> GraphBuilt -> Synthesized | Pruned ->
//! Rewritten`. Locate and parse failures abort before anything is written;
//! once writing starts each manifest is persisted independently.
//!
//! ```no_run
//! use crosslink_core::{crosslink, RunConfig, TracingSink};
//!
//! let mut config = RunConfig::new("path/to/repo");
//! config.prune = true;
//! let summary = crosslink(&config, &TracingSink).unwrap();
//! println!("rewrote {} manifests", summary.written.len());
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod log;
pub mod manifest;
pub mod prune;
pub mod rewrite;
pub mod synth;

// Re-export commonly used types
pub use config::RunConfig;
pub use discovery::{Module, ModuleSet};
pub use error::{CrosslinkError, Result};
pub use graph::DependencyGraph;
pub use log::{Level, LogSink, Logger, MemorySink, NullSink, TracingSink};

use serde::Serialize;

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Modules located under the root
    pub modules: usize,
    /// Root-relative manifests that were rewritten
    pub written: Vec<String>,
    pub added: usize,
    pub updated: usize,
    /// Differing replaces left in place
    pub kept: usize,
    pub pruned: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Crosslink,
    PruneOnly,
}

/// Insert or repoint local replaces for every intra-repository dependency
///
/// Prunes unjustified replaces afterwards when `config.prune` is set.
pub fn crosslink(config: &RunConfig, sink: &dyn LogSink) -> Result<RunSummary> {
    run(config, sink, Mode::Crosslink)
}

/// Remove replaces that no dependency edge justifies, adding nothing
pub fn prune(config: &RunConfig, sink: &dyn LogSink) -> Result<RunSummary> {
    run(config, sink, Mode::PruneOnly)
}

fn run(config: &RunConfig, sink: &dyn LogSink, mode: Mode) -> Result<RunSummary> {
    let log = Logger::new(sink, config.verbose);

    let modules = discovery::locate_modules(config, log)?;
    log.debug(format!(
        "located {} modules under {}",
        modules.len(),
        modules.root.display()
    ));

    let graph = DependencyGraph::build(&modules, &config.excluded_paths);
    log.debug(format!(
        "dependency graph has {} modules and {} edges",
        graph.node_count(),
        graph.edge_count()
    ));

    let mut summary = RunSummary {
        modules: modules.len(),
        ..RunSummary::default()
    };

    for module in modules.modules.values() {
        if module.skipped {
            log.debug(format!("{}: skipped, leaving {} untouched", module.identity, module.rel_manifest_path));
            continue;
        }

        let mut manifest = module.manifest.clone();

        if mode == Mode::Crosslink {
            let directives = synth::synthesize(module, &modules, &graph, config);
            let outcome = rewrite::apply_directives(&mut manifest, &directives, config.overwrite, log);
            summary.added += outcome.added.len();
            summary.updated += outcome.updated.len();
            summary.kept += outcome.kept.len();
        }

        if mode == Mode::PruneOnly || config.prune {
            let pruned = prune::prune_manifest(module, &mut manifest, &modules, &graph, config, log);
            summary.pruned += pruned.len();
        }

        let rendered = manifest.render();
        if rendered != module.original {
            rewrite::write_atomic(&module.manifest_path, &rendered)?;
            log.info(format!("updated {}", module.rel_manifest_path));
            summary.written.push(module.rel_manifest_path.clone());
        }
    }

    Ok(summary)
}
