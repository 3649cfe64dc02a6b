//! Show command - list cached entries

use super::cache_location;
use crate::cache::{CacheMap, CacheStore};
use crate::cli::args::{OutputFormat, ShowArgs};
use crate::config::Config;
use crate::error::AssetCacheResult;

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> AssetCacheResult<()> {
    let (root, cache_path) = cache_location(config, args.cache.as_deref())?;
    let path = root.join(cache_path);

    let Some(entries) = CacheStore::read_entries(&path).await? else {
        println!("No cache file at {}", path.display());
        return Ok(());
    };

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &CacheMap) {
    let width = entries
        .keys()
        .map(|k| k.as_str().len())
        .max()
        .unwrap_or(0)
        .max("PATH".len());

    println!("{:<width$}  FINGERPRINT", "PATH", width = width);
    println!("{}", "-".repeat(width + 2 + 32));

    for (key, fingerprint) in entries {
        println!("{:<width$}  {}", key.as_str(), fingerprint, width = width);
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

fn print_plain(entries: &CacheMap) {
    for key in entries.keys() {
        println!("{}", key);
    }
}
