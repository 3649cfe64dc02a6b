//! Persisted and in-run fingerprint mappings
//!
//! A [`CacheStore`] owns two mappings for one pipeline run:
//!
//! - the persisted mapping, loaded once from the cache file when the store is
//!   opened and read-only afterwards, and
//! - the current mapping, empty at start and filled by the recorder as
//!   records pass through it.
//!
//! Only the current mapping is written back at flush, so keys that no record
//! visited during the run disappear from the cache file.
//!
//! Loading is not re-entrant per path: stages that share a cache file must
//! share one store, otherwise each would hold its own view of the file.

use crate::error::{AssetCacheError, AssetCacheResult};
use crate::fingerprint::{CacheKey, Fingerprint};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default cache file name, relative to the root
pub const DEFAULT_CACHE_FILE: &str = ".asset-cache";

/// Key to fingerprint mapping, kept sorted so flushed files diff cleanly
pub type CacheMap = BTreeMap<CacheKey, Fingerprint>;

/// Reasons a cache file could not be loaded
///
/// Never leaves this module: every variant degrades to an empty mapping.
#[derive(Error, Debug)]
enum CacheLoadError {
    #[error("cache file not found")]
    Missing,

    #[error("reading cache file: {0}")]
    Read(#[source] std::io::Error),

    #[error("parsing cache file: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Cache state for a single pipeline run
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    path: PathBuf,
    persisted: CacheMap,
    current: Mutex<CacheMap>,
    flushed: AtomicBool,
}

impl CacheStore {
    /// Open the cache file with the current working directory as root
    pub fn open(cache_path: impl AsRef<Path>) -> AssetCacheResult<Self> {
        let root = std::env::current_dir()
            .map_err(|e| AssetCacheError::io("getting current directory", e))?;
        Ok(Self::with_root(root, cache_path))
    }

    /// Open the cache file with an explicit root
    ///
    /// A relative `cache_path` is resolved against `root`.
    pub fn with_root(root: impl Into<PathBuf>, cache_path: impl AsRef<Path>) -> Self {
        let root = root.into();
        let path = root.join(cache_path.as_ref());
        let persisted = Self::load(&path);

        Self {
            root,
            path,
            persisted,
            current: Mutex::new(CacheMap::new()),
            flushed: AtomicBool::new(false),
        }
    }

    /// Load a cache file, treating any failure as an empty cache
    pub fn load(path: &Path) -> CacheMap {
        match Self::try_load(path) {
            Ok(map) => {
                debug!("Loaded {} cache entries from {}", map.len(), path.display());
                map
            }
            Err(CacheLoadError::Missing) => {
                debug!("No cache file at {}, starting empty", path.display());
                CacheMap::new()
            }
            Err(e) => {
                warn!("Ignoring cache file {}: {}", path.display(), e);
                CacheMap::new()
            }
        }
    }

    fn try_load(path: &Path) -> Result<CacheMap, CacheLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CacheLoadError::Missing,
            _ => CacheLoadError::Read(e),
        })?;
        serde_json::from_str(&content).map_err(CacheLoadError::Parse)
    }

    /// Read a cache file for display, reporting parse failures
    ///
    /// Returns `None` when the file does not exist.
    pub async fn read_entries(path: &Path) -> AssetCacheResult<Option<CacheMap>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AssetCacheError::io(format!("reading {}", path.display()), e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Root that cache keys are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compute the cache key for a path under this store's root
    pub fn key_for(&self, path: &Path) -> CacheKey {
        CacheKey::from_path(&self.root, path)
    }

    /// Look up a key in the persisted mapping
    pub fn lookup(&self, key: &CacheKey) -> Option<&Fingerprint> {
        self.persisted.get(key)
    }

    /// The mapping loaded at open time
    pub fn persisted(&self) -> &CacheMap {
        &self.persisted
    }

    /// Insert or overwrite an entry in the current mapping
    pub async fn record(&self, key: CacheKey, fingerprint: Fingerprint) {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.insert(key.clone(), fingerprint) {
            debug!("Replaced fingerprint {} for {}", previous, key);
        }
    }

    /// Carry the persisted fingerprint of `key` into the current mapping
    ///
    /// Returns `false` when the key was not persisted. An entry already
    /// recorded this run is left alone.
    pub async fn retain_previous(&self, key: &CacheKey) -> bool {
        let Some(previous) = self.persisted.get(key) else {
            return false;
        };

        let mut current = self.current.lock().await;
        current
            .entry(key.clone())
            .or_insert_with(|| previous.clone());
        true
    }

    /// Copy of the current mapping
    pub async fn snapshot(&self) -> CacheMap {
        self.current.lock().await.clone()
    }

    /// Whether the current mapping has been written out
    pub fn is_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }

    /// Write the current mapping to the cache file
    ///
    /// The file is replaced through a temporary sibling and a rename. Only
    /// one successful flush is allowed per store. Returns the entry count.
    pub async fn flush(&self) -> AssetCacheResult<usize> {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return Err(AssetCacheError::AlreadyFlushed {
                path: self.path.clone(),
            });
        }

        let result = self.write_current().await;
        if result.is_err() {
            self.flushed.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn write_current(&self) -> AssetCacheResult<usize> {
        let current = self.current.lock().await;
        let mut content = serde_json::to_string_pretty(&*current)?;
        content.push('\n');

        let flush_err = |source| AssetCacheError::Flush {
            path: self.path.clone(),
            source,
        };

        let file_name = self.path.file_name().ok_or_else(|| {
            flush_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "cache path has no file name",
            ))
        })?;
        let mut temp_name = file_name.to_os_string();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(flush_err)?;
        }

        fs::write(&temp_path, content).await.map_err(flush_err)?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(flush_err(e));
        }

        info!(
            "Wrote {} cache entries to {}",
            current.len(),
            self.path.display()
        );
        Ok(current.len())
    }
}
