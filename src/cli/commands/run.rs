//! Run command - filter files against the cache and record the result

use super::cache_location;
use crate::cache::CacheStore;
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::error::{AssetCacheError, AssetCacheResult};
use crate::fingerprint::CacheKey;
use crate::pipeline::{FilterStage, Pipeline};
use crate::ui::{ConsoleReporter, UiContext};
use console::style;
use futures_util::stream;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> AssetCacheResult<()> {
    let cwd =
        std::env::current_dir().map_err(|e| AssetCacheError::io("getting current directory", e))?;
    let (root, cache_path) = cache_location(config, args.cache.as_deref())?;
    let store = Arc::new(CacheStore::with_root(root, cache_path));

    let mut inputs = args.paths.clone();
    if args.stdin {
        inputs.extend(read_stdin_paths()?);
    }
    if inputs.is_empty() {
        return Err(AssetCacheError::User(
            "No input files. Pass paths or use --stdin".to_string(),
        ));
    }

    let files = collect_files(&cwd, &inputs, store.path())?;
    debug!("Collected {} input files", files.len());

    let ctx = UiContext::detect().with_quiet(args.quiet || config.pipeline.quiet);
    let filter = FilterStage::with_store(Arc::clone(&store))
        .with_observer(Arc::new(ConsoleReporter::new(ctx)));
    let pipeline = Pipeline::new(filter)
        .with_recording(!args.dry_run)
        .concurrency(args.jobs.unwrap_or(config.pipeline.concurrency));

    let report = pipeline
        .run_files_until(stream::iter(files), interrupted())
        .await?;

    let mut forwarded = report.forwarded_paths();
    forwarded.sort();
    let mut stdout = io::stdout().lock();
    for path in &forwarded {
        let shown = path.strip_prefix(&cwd).unwrap_or(path);
        writeln!(stdout, "{}", shown.display())
            .map_err(|e| AssetCacheError::io("writing to stdout", e))?;
    }

    for failure in &report.errors {
        eprintln!(
            "{} {}: {}",
            style("warning:").yellow(),
            failure.path.display(),
            failure.error
        );
    }

    if report.flushed {
        info!(
            "Cache {} updated with {} entries",
            store.path().display(),
            report.entries
        );
    } else {
        info!("Dry run - cache not written");
    }

    Ok(())
}

/// Resolves when the user presses Ctrl+C
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; never cancel
        std::future::pending::<()>().await;
    }
    warn!("Interrupted");
}

/// Expand inputs into a sorted, de-duplicated list of absolute file paths
///
/// Directories are walked recursively. The cache file and its temporary
/// sibling are never treated as inputs.
fn collect_files(cwd: &Path, inputs: &[PathBuf], cache_path: &Path) -> AssetCacheResult<Vec<PathBuf>> {
    let cache_key = CacheKey::from_path(cwd, cache_path);
    let temp_key = CacheKey::from_path(cwd, &temp_sibling(cache_path));
    let is_cache_file = |path: &Path| {
        let key = CacheKey::from_path(cwd, path);
        key == cache_key || key == temp_key
    };

    let mut files = Vec::new();
    for input in inputs {
        let path = cwd.join(input);
        if path.is_dir() {
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    AssetCacheError::User(format!("walking {}: {}", path.display(), e))
                })?;
                if entry.file_type().is_file() && !is_cache_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            if !is_cache_file(&path) {
                files.push(path);
            }
        } else {
            return Err(AssetCacheError::PathNotFound(input.clone()));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// `<cache>.tmp`, the file a flush writes before renaming
fn temp_sibling(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn read_stdin_paths() -> AssetCacheResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| AssetCacheError::io("reading paths from stdin", e))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }
    Ok(paths)
}
