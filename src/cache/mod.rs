//! Fingerprint cache persisted between pipeline runs
//!
//! The cache file is a flat JSON object mapping normalized relative paths
//! to fingerprints. It is read once at the start of a run and replaced
//! wholesale at the end.
//!
//! # Run Lifecycle
//!
//! | Step | Mapping | Description |
//! |------|---------|-------------|
//! | Open | persisted | Cache file parsed; missing or corrupt = empty |
//! | Filter | persisted | Read-only lookups, no locking |
//! | Record | current | Serialized inserts, last writer wins |
//! | Flush | current | Written once after all records drained |

pub mod store;

pub use store::{CacheMap, CacheStore, DEFAULT_CACHE_FILE};
