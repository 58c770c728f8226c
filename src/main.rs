//! ppbt - portable toolchain builder
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use ppbt::cli::{Cli, Commands};
use ppbt::config::ConfigManager;
use ppbt::error::{PpbtError, PpbtResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status for a missing toolchain config
const EXIT_MISSING_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let PpbtError::BuildCommand { output, .. } = &e {
                if !output.is_empty() {
                    eprintln!("{}", style(output).dim());
                }
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            if e.is_fatal_config() {
                ExitCode::from(EXIT_MISSING_CONFIG)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run() -> PpbtResult<()> {
    let cli = Cli::parse();

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("ppbt=warn"),
        1 => EnvFilter::new("ppbt=info"),
        _ => EnvFilter::new("ppbt=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Triplet resolution needs no configuration
    if let Commands::Triplet(args) = cli.command {
        return ppbt::cli::commands::triplet(args).await;
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    debug!("Using config {}", config_manager.path().display());
    let config = config_manager.load().await?;

    match cli.command {
        Commands::Triplet(_) => unreachable!("Triplet handled above"),
        Commands::Build(args) => ppbt::cli::commands::build(args, &config).await,
        Commands::Extract(args) => ppbt::cli::commands::extract(args, &config).await,
        Commands::Env(args) => ppbt::cli::commands::env(args, &config).await,
        Commands::List(args) => ppbt::cli::commands::list(args, &config).await,
        Commands::Config(args) => {
            ppbt::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
