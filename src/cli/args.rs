//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// asset-cache - skip build assets that have not changed
///
/// Fingerprints files by relative path and size, compares them with the
/// cache from the previous run, and prints only the files that changed.
#[derive(Parser, Debug)]
#[command(name = "asset-cache")]
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
    #[arg(short, long, global = true, env = "ASSET_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .asset-cache.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter files against the cache and print the changed ones
    Run(RunArgs),

    /// Show cached entries
    Show(ShowArgs),

    /// Delete the cache file
    Clear(ClearArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Files or directories to check (directories are walked recursively)
    pub paths: Vec<PathBuf>,

    /// Also read paths from stdin, one per line
    #[arg(long)]
    pub stdin: bool,

    /// Cache file (defaults to the configured path)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Files processed at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Filter only, do not write the cache file
    #[arg(long)]
    pub dry_run: bool,

    /// Hide per-file cached/uncached lines
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Cache file (defaults to the configured path)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Cache file (defaults to the configured path)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
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

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Output format for the show command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one key per line)
    Plain,
}
