//! Filter stage: suppress records whose fingerprint is unchanged

use crate::cache::{CacheStore, DEFAULT_CACHE_FILE};
use crate::error::{AssetCacheError, AssetCacheResult};
use crate::fingerprint::{fingerprint, CacheKey, Fingerprint};
use crate::pipeline::observer::{CacheObserver, CacheStatus, TracingObserver};
use crate::pipeline::recorder::RecorderStage;
use crate::record::Record;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// What the filter decided for one record
#[derive(Debug)]
pub enum Decision {
    /// New or changed; pass downstream
    Forward(Record),
    /// Matches the persisted cache; drop from the stream
    Suppress {
        key: CacheKey,
        fingerprint: Fingerprint,
    },
    /// Marker record with no content; ends here
    Skip,
}

impl Decision {
    /// Whether the record continues downstream
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::Forward(_))
    }

    /// Whether the record was suppressed as unchanged
    pub fn is_suppress(&self) -> bool {
        matches!(self, Self::Suppress { .. })
    }
}

/// Compares incoming records against the persisted cache
///
/// Only reads the persisted mapping; recording is left to a downstream
/// [`RecorderStage`] so a caller can filter without ever persisting.
pub struct FilterStage {
    store: Arc<CacheStore>,
    observer: Arc<dyn CacheObserver>,
}

impl FilterStage {
    /// Open the cache file (default `.asset-cache`) relative to the working directory
    pub fn new(cache_path: Option<&Path>) -> AssetCacheResult<Self> {
        let cache_path = cache_path.unwrap_or_else(|| Path::new(DEFAULT_CACHE_FILE));
        let store = CacheStore::open(cache_path)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    /// Build a filter over an already opened store
    pub fn with_store(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the status observer
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The store shared with the recorder
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Create a recorder that writes into this filter's store
    pub fn recorder(&self) -> RecorderStage {
        RecorderStage::new(Arc::clone(&self.store))
    }

    /// Decide whether a record is unchanged since the last run
    pub async fn process(&self, record: Record) -> AssetCacheResult<Decision> {
        if record.is_null() {
            debug!("Skipping empty record {}", record.path().display());
            return Ok(Decision::Skip);
        }
        record.ensure_buffered()?;

        let key = self.store.key_for(record.path());
        let size = match record.size() {
            Some(size) => size,
            None => disk_size(record.path()).await?,
        };
        let fingerprint = fingerprint(&key, size);

        if self.store.lookup(&key) == Some(&fingerprint) {
            self.observer.on_status(CacheStatus::Cached, &key);
            Ok(Decision::Suppress { key, fingerprint })
        } else {
            self.observer.on_status(CacheStatus::Uncached, &key);
            Ok(Decision::Forward(record))
        }
    }
}

/// Current size of a file on disk
pub(crate) async fn disk_size(path: &Path) -> AssetCacheResult<u64> {
    fs::metadata(path)
        .await
        .map(|meta| meta.len())
        .map_err(|e| AssetCacheError::stat(path, e))
}
