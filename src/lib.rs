//! asset-cache - build-pipeline artifact cache
//!
//! Fingerprints file records by relative path and size, suppresses the ones
//! that match the cache from the previous run, and persists the fingerprints
//! of every file seen once the pipeline has drained.
//!
//! ```rust,ignore
//! use asset_cache::{FilterStage, Pipeline, Record};
//! use futures_util::stream;
//!
//! let filter = FilterStage::new(None)?;
//! let report = Pipeline::new(filter)
//!     .run(stream::iter(vec![Record::from_file("img/logo.png").await?]))
//!     .await?;
//! for path in report.forwarded_paths() {
//!     println!("{}", path.display());
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod record;
pub mod ui;

pub use cache::CacheStore;
pub use error::{AssetCacheError, AssetCacheResult};
pub use fingerprint::{fingerprint, CacheKey, Fingerprint};
pub use pipeline::{Decision, FilterStage, Pipeline, RecorderStage, RunReport, Transform};
pub use record::Record;
