//! swift-scip CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use swift_scip::commands::{run_index, run_status, CommandContext};
use swift_scip::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run(cli: &Cli) -> swift_scip::Result<String> {
    let ctx = CommandContext::from_cli(cli.verbose);

    match &cli.command {
        Commands::Index(args) => run_index(args, &ctx),
        Commands::Status(args) => run_status(args, &ctx),
    }
}

/// Diagnostics go to stderr; `--verbose` raises the default level to debug
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
