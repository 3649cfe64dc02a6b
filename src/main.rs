//! asset-cache CLI entry point
//!
//! Loads configuration, sets up logging and dispatches to subcommands.

use asset_cache::cli::{Cli, Commands};
use asset_cache::config::{Config, ConfigManager};
use asset_cache::error::{AssetCacheError, AssetCacheResult};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AssetCacheResult<()> {
    let cli = Cli::parse();

    // Completions don't need config or logging
    if let Commands::Completions(args) = cli.command {
        return asset_cache::cli::commands::completions(args);
    }

    let config = load_config(&cli).await?;
    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Completions(_) => unreachable!("Completions handled above"),
        Commands::Run(args) => asset_cache::cli::commands::run(args, &config).await,
        Commands::Show(args) => asset_cache::cli::commands::show(args, &config).await,
        Commands::Clear(args) => asset_cache::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            asset_cache::cli::commands::config(args, &config, cli.config.clone()).await
        }
    }
}

async fn load_config(cli: &Cli) -> AssetCacheResult<Config> {
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| AssetCacheError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    config_manager
        .load_merged(local_config_path.as_deref())
        .await
}

/// Initialize logging on stderr: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 if config.general.verbose => "asset_cache=info",
        0 => "asset_cache=warn",
        1 => "asset_cache=info",
        _ => "asset_cache=debug",
    };
    let filter = EnvFilter::try_from_env("ASSET_CACHE_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }

    debug!("Logging initialized");
}
