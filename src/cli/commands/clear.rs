//! Clear command - delete the cache file

use super::cache_location;
use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::{AssetCacheError, AssetCacheResult};
use console::style;
use std::io::{self, Write};
use tokio::fs;
use tracing::debug;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> AssetCacheResult<()> {
    let (root, cache_path) = cache_location(config, args.cache.as_deref())?;
    let path = root.join(cache_path);

    if !path.exists() {
        println!("No cache file to clear.");
        return Ok(());
    }

    if !args.yes {
        print!("Remove {}? [y/N] ", path.display());
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    debug!("Removing cache file: {}", path.display());
    fs::remove_file(&path)
        .await
        .map_err(|e| AssetCacheError::io(format!("removing {}", path.display()), e))?;

    println!("{} removed {}", style("✓").green(), path.display());
    Ok(())
}
