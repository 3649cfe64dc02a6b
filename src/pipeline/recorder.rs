//! Recorder stage: capture final fingerprints and flush once at the end
//!
//! Every record reaching the recorder is stat'ed again, because steps between
//! the filter and the recorder may have rewritten the file. Whatever is
//! recorded last for a key wins.
//!
//! The recorder tracks in-flight `process` calls. [`RecorderStage::finish`]
//! closes the recorder, waits for the in-flight count to reach zero and only
//! then flushes, so no write can race the flush. [`RecorderStage::abort`]
//! closes it for good and prevents the flush.

use crate::cache::CacheStore;
use crate::error::{AssetCacheError, AssetCacheResult};
use crate::fingerprint::{fingerprint, CacheKey, Fingerprint};
use crate::pipeline::filter::disk_size;
use crate::record::Record;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Records fingerprints into a shared [`CacheStore`]
#[derive(Clone)]
pub struct RecorderStage {
    store: Arc<CacheStore>,
    gate: Arc<Gate>,
}

impl RecorderStage {
    /// Create a recorder writing into `store`
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            gate: Arc::new(Gate::default()),
        }
    }

    /// Record the current fingerprint of a record and pass it on unchanged
    ///
    /// If the file cannot be stat'ed the key keeps its persisted
    /// fingerprint, if it had one, and the error is returned.
    pub async fn process(&self, record: Record) -> AssetCacheResult<Record> {
        let _in_flight = self.gate.enter()?;

        if record.is_null() {
            return Ok(record);
        }
        record.ensure_buffered()?;

        let key = self.store.key_for(record.path());
        match disk_size(record.path()).await {
            Ok(size) => {
                let fp = fingerprint(&key, size);
                debug!("Recording {} ({} bytes)", key, size);
                self.store.record(key, fp).await;
                Ok(record)
            }
            Err(e) => {
                if self.store.retain_previous(&key).await {
                    warn!("Keeping previous fingerprint for {}: {}", key, e);
                }
                Err(e)
            }
        }
    }

    /// Record a fingerprint already computed upstream
    ///
    /// Used for records the filter suppressed: they were not touched, so the
    /// filter's fingerprint is still current.
    pub async fn retain(&self, key: CacheKey, fingerprint: Fingerprint) -> AssetCacheResult<()> {
        let _in_flight = self.gate.enter()?;
        self.store.record(key, fingerprint).await;
        Ok(())
    }

    /// Keep the persisted fingerprint for a path that could not be processed
    pub async fn retain_previous(&self, path: &Path) -> AssetCacheResult<bool> {
        let _in_flight = self.gate.enter()?;
        let key = self.store.key_for(path);
        Ok(self.store.retain_previous(&key).await)
    }

    /// Close the recorder, wait for in-flight records, then flush
    ///
    /// Returns the number of entries written. Fails without writing if the
    /// recorder was aborted.
    pub async fn finish(&self) -> AssetCacheResult<usize> {
        self.gate.closed.store(true, Ordering::SeqCst);
        self.gate.drained().await;

        if self.gate.aborted.load(Ordering::SeqCst) {
            return Err(AssetCacheError::Aborted(format!(
                "cache {} not written",
                self.store.path().display()
            )));
        }

        self.store.flush().await
    }

    /// Stop accepting records and suppress the flush
    pub fn abort(&self) {
        self.gate.aborted.store(true, Ordering::SeqCst);
        self.gate.closed.store(true, Ordering::SeqCst);
        warn!(
            "Run aborted, leaving {} untouched",
            self.store.path().display()
        );
    }

    /// Whether the recorder was aborted
    pub fn is_aborted(&self) -> bool {
        self.gate.aborted.load(Ordering::SeqCst)
    }

    /// Number of records currently being recorded
    pub fn in_flight(&self) -> usize {
        self.gate.active.load(Ordering::SeqCst)
    }

    /// The store this recorder writes into
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }
}

/// In-flight counter with a closed flag
#[derive(Default)]
struct Gate {
    active: AtomicUsize,
    closed: AtomicBool,
    aborted: AtomicBool,
    idle: Notify,
}

impl Gate {
    /// Register an in-flight call, failing once the gate is closed
    fn enter(&self) -> AssetCacheResult<InFlight<'_>> {
        // Count first so a concurrent drain cannot miss this call
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self);
        if self.closed.load(Ordering::SeqCst) {
            return Err(AssetCacheError::RecorderClosed);
        }
        Ok(guard)
    }

    async fn drained(&self) {
        loop {
            let notified = self.idle.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlight<'a>(&'a Gate);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}
