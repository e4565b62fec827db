//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// SCIP indexer for Swift projects, driven by the compiler's index store
#[derive(Parser, Debug)]
#[command(name = "swift-scip")]
#[command(about = "Produce a SCIP code-intelligence index from a Swift index store")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands for swift-scip
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or update the index for a project
    Index(IndexArgs),

    /// Report repository, state and branch-cache information
    Status(StatusArgs),
}

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Derived-data directory containing the compiler's index store
    #[arg(long, value_name = "PATH")]
    pub derived_data: PathBuf,

    /// Project root directory (the git repository)
    #[arg(long, value_name = "PATH")]
    pub project_root: PathBuf,

    /// Output path for the index
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Reindex only files changed since the last recorded commit
    #[arg(long)]
    pub incremental: bool,

    /// Rebuild from scratch even when caches are current
    #[arg(long)]
    pub force: bool,

    /// Restrict indexing to the named modules (repeatable)
    #[arg(long = "module", value_name = "NAME")]
    pub modules: Vec<String>,

    /// Skip one-line source snippets on occurrences
    #[arg(long)]
    pub no_include_snippets: bool,

    /// Emit the legacy JSON document instead of a database
    #[arg(long)]
    pub json: bool,
}

impl IndexArgs {
    /// Snippets are on unless explicitly disabled
    pub fn include_snippets(&self) -> bool {
        !self.no_include_snippets
    }
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Project root directory (the git repository)
    #[arg(long, value_name = "PATH")]
    pub project_root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_index_flags_parse() {
        let cli = Cli::try_parse_from([
            "swift-scip",
            "index",
            "--derived-data",
            "/dd",
            "--project-root",
            "/proj",
            "--output",
            "/out/index.db",
            "--incremental",
            "--module",
            "App",
            "--module",
            "Core",
            "--no-include-snippets",
        ])
        .unwrap();

        match cli.command {
            Commands::Index(args) => {
                assert!(args.incremental);
                assert!(!args.force);
                assert_eq!(args.modules, vec!["App", "Core"]);
                assert!(!args.include_snippets());
                assert!(!args.json);
            }
            _ => panic!("expected index subcommand"),
        }
    }

    #[test]
    fn test_status_parse() {
        let cli = Cli::try_parse_from(["swift-scip", "status", "--project-root", "/proj", "-v"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status(_)));
    }
}
