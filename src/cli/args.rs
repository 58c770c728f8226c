//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ppbt - portable toolchain builder
///
/// Builds a target-triplet compiler toolchain with crosstool-ng, packages
/// it with a content-hash manifest and hands out a ready-to-use build
/// environment on demand.
#[derive(Parser, Debug)]
#[command(name = "ppbt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PPBT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and package the toolchain
    Build(BuildArgs),

    /// Extract the packaged toolchain
    Extract(ExtractArgs),

    /// Print the build environment for the toolchain
    Env(EnvArgs),

    /// Print the resolved target triplet
    Triplet(TargetArgs),

    /// List packaged toolchains
    List(ListArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Target selection shared by several commands
#[derive(Parser, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target machine (defaults to the host machine)
    #[arg(short, long)]
    pub machine: Option<String>,

    /// Target platform: linux, darwin or win32 (defaults to the host)
    #[arg(short, long)]
    pub platform: Option<String>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Build the generator from this source control branch
    #[arg(short, long)]
    pub branch: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the extract command
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Replace an already extracted toolchain
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the env command
#[derive(Parser, Debug)]
pub struct EnvArgs {
    /// Extract the toolchain first if needed
    #[arg(long)]
    pub auto_extract: bool,

    /// Output format
    #[arg(short, long, default_value = "shell")]
    pub format: EnvFormat,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Output format for env command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvFormat {
    /// `export KEY='value'` lines
    Shell,
    /// JSON object
    Json,
}
