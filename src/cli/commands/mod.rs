//! CLI command implementations

pub mod clear;
pub mod completions;
pub mod config;
pub mod run;
pub mod show;

pub use clear::execute as clear;
pub use completions::execute as completions;
pub use config::execute as config;
pub use run::execute as run;
pub use show::execute as show;

use crate::config::Config;
use crate::error::{AssetCacheError, AssetCacheResult};
use std::path::{Path, PathBuf};

/// Resolve the key root and cache file from config and an optional override
///
/// The root is `cache.root` from the config, or the working directory.
/// Relative roots are taken relative to the working directory.
pub(crate) fn cache_location(
    config: &Config,
    cache_override: Option<&Path>,
) -> AssetCacheResult<(PathBuf, PathBuf)> {
    let cwd =
        std::env::current_dir().map_err(|e| AssetCacheError::io("getting current directory", e))?;
    let root = match &config.cache.root {
        Some(root) => cwd.join(root),
        None => cwd,
    };
    let cache_path = cache_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.cache.path.clone());

    Ok((root, cache_path))
}
