//! Per-record cache status events

use crate::fingerprint::CacheKey;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Outcome of comparing a record against the persisted cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Fingerprint matched, record suppressed
    Cached,
    /// Fingerprint new or changed, record forwarded
    Uncached,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cached => write!(f, "cached"),
            Self::Uncached => write!(f, "uncached"),
        }
    }
}

/// Receives one event per filtered record
///
/// Purely observational; implementations must not affect data flow.
pub trait CacheObserver: Send + Sync {
    /// Called after the filter decided on a record
    fn on_status(&self, status: CacheStatus, key: &CacheKey);
}

/// Observer that emits structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_status(&self, status: CacheStatus, key: &CacheKey) {
        info!(key = %key, status = %status, "asset {}", status);
    }
}
