use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crosslink_core::{RunConfig, RunSummary, TracingSink};
use std::path::PathBuf;

/// crosslink - Keep intra-repository replace directives in sync
#[derive(Parser)]
#[command(name = "crosslink")]
#[command(version)] // Auto-pull version from Cargo.toml
#[command(about = "Insert and prune local replace directives across a multi-module Go repository", long_about = None)]
struct Cli {
    /// Repository root containing the top-level go.mod (defaults to current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// TOML file with run options; flags are layered on top
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Replace existing local overrides whose path is stale
    #[arg(long, global = true)]
    overwrite: bool,

    /// Also remove overrides no dependency justifies
    #[arg(long, global = true)]
    prune: bool,

    /// Module identity to keep out of the dependency graph (repeatable, comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Root-relative go.mod path or glob never rewritten (repeatable, comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    skip: Vec<String>,

    /// Print debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove unjustified intra-repository replace directives without adding any
    Prune,
}

impl Cli {
    /// Merge flags over the config file (or defaults)
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(root) = &self.root {
            config.root_path = root.clone();
        } else if self.config.is_none() {
            config.root_path = std::env::current_dir().context("failed to get current directory")?;
        }
        config.overwrite |= self.overwrite;
        config.prune |= self.prune;
        config.verbose |= self.verbose;
        config.excluded_paths.extend(self.exclude.iter().cloned());
        config.skipped_paths.extend(self.skip.iter().cloned());

        Ok(config)
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "{} modules, {} manifests updated ({} added, {} updated, {} kept, {} pruned)",
        summary.modules,
        summary.written.len(),
        summary.added,
        summary.updated,
        summary.kept,
        summary.pruned
    );
    for path in &summary.written {
        println!("  {path}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.run_config()?;

    let summary = match cli.command {
        None => crosslink_core::crosslink(&config, &TracingSink)
            .with_context(|| format!("crosslink failed in {}", config.root_path.display()))?,
        Some(Commands::Prune) => crosslink_core::prune(&config, &TracingSink)
            .with_context(|| format!("prune failed in {}", config.root_path.display()))?,
    };

    print_summary(&summary, cli.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_layer_over_defaults() {
        let cli = Cli::parse_from([
            "crosslink",
            "--root",
            "repo",
            "--prune",
            "--exclude",
            "example.com/a,example.com/b",
            "--skip",
            "testA/go.mod",
        ]);

        let config = cli.run_config().unwrap();

        assert_eq!(config.root_path, PathBuf::from("repo"));
        assert!(config.prune);
        assert!(!config.overwrite);
        assert_eq!(config.excluded_paths.len(), 2);
        assert!(config.skipped_paths.contains("testA/go.mod"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_prune_subcommand_accepts_global_flags() {
        let cli = Cli::parse_from(["crosslink", "prune", "--root", "repo", "-v"]);

        assert!(matches!(cli.command, Some(Commands::Prune)));
        assert!(cli.run_config().unwrap().verbose);
    }
}
