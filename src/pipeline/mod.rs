//! Filter → transforms → recorder pipeline driver
//!
//! The driver pulls records from an input stream, processes up to
//! `concurrency` of them at a time, and once the input is exhausted and every
//! record has completed it finishes the recorder, which flushes the cache.
//!
//! Record-scoped failures (a file that cannot be stat'ed) are collected in
//! the [`RunReport`]. Anything else aborts the run: in-flight records are
//! dropped, the recorder is aborted and the cache file is left as it was.

pub mod filter;
pub mod observer;
pub mod recorder;

pub use filter::{Decision, FilterStage};
pub use observer::{CacheObserver, CacheStatus, TracingObserver};
pub use recorder::RecorderStage;

use crate::error::{AssetCacheError, AssetCacheResult};
use crate::fingerprint::CacheKey;
use crate::record::Record;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of records processed at once
pub const DEFAULT_CONCURRENCY: usize = 16;

/// External processing step between the filter and the recorder
///
/// A transform may rewrite the file behind a record; the recorder stats the
/// file again after all transforms ran.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Process one forwarded record
    async fn apply(&self, record: Record) -> AssetCacheResult<Record>;
}

/// Error attached to a single record
#[derive(Debug)]
pub struct RecordError {
    /// Path of the record that failed
    pub path: PathBuf,
    /// What went wrong
    pub error: AssetCacheError,
}

/// Summary of a completed run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Records that passed the filter, in completion order
    pub forwarded: Vec<Record>,
    /// Keys of records suppressed as unchanged
    pub suppressed: Vec<CacheKey>,
    /// Empty marker records dropped by the filter
    pub skipped: usize,
    /// Per-record failures that did not abort the run
    pub errors: Vec<RecordError>,
    /// Whether the cache file was written
    pub flushed: bool,
    /// Number of entries written to the cache file
    pub entries: usize,
}

impl RunReport {
    /// Paths of forwarded records
    pub fn forwarded_paths(&self) -> Vec<PathBuf> {
        self.forwarded
            .iter()
            .map(|r| r.path().to_path_buf())
            .collect()
    }

    /// Whether any record failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Forwarded(record) => self.forwarded.push(record),
            Outcome::Suppressed(key) => self.suppressed.push(key),
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(error) => self.errors.push(error),
        }
    }
}

/// One item entering the pipeline
enum Input {
    Record(Record),
    File(PathBuf),
}

enum Outcome {
    Forwarded(Record),
    Suppressed(CacheKey),
    Skipped,
    Failed(RecordError),
}

/// A configured pipeline over one cache store
pub struct Pipeline {
    filter: FilterStage,
    transforms: Vec<Arc<dyn Transform>>,
    recording: bool,
    concurrency: usize,
}

impl Pipeline {
    /// Create a pipeline that filters and records through `filter`'s store
    pub fn new(filter: FilterStage) -> Self {
        Self {
            filter,
            transforms: Vec::new(),
            recording: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Append a processing step between filter and recorder
    pub fn then(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    /// Enable or disable the recorder (disabled = filter only, nothing written)
    pub fn with_recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }

    /// Maximum number of records processed at once (at least 1)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The filter stage
    pub fn filter(&self) -> &FilterStage {
        &self.filter
    }

    /// Run the pipeline to completion
    pub async fn run<S>(&self, records: S) -> AssetCacheResult<RunReport>
    where
        S: Stream<Item = Record>,
    {
        self.run_until(records, std::future::pending()).await
    }

    /// Run the pipeline, aborting without a flush if `cancel` resolves first
    pub async fn run_until<S, C>(&self, records: S, cancel: C) -> AssetCacheResult<RunReport>
    where
        S: Stream<Item = Record>,
        C: Future<Output = ()>,
    {
        self.drive(records.map(Input::Record), cancel).await
    }

    /// Read files from disk and run them through the pipeline
    ///
    /// A file that cannot be read is reported in [`RunReport::errors`] and
    /// keeps its persisted fingerprint, like a file that cannot be stat'ed.
    pub async fn run_files_until<S, C>(&self, paths: S, cancel: C) -> AssetCacheResult<RunReport>
    where
        S: Stream<Item = PathBuf>,
        C: Future<Output = ()>,
    {
        self.drive(paths.map(Input::File), cancel).await
    }

    async fn drive<S, C>(&self, inputs: S, cancel: C) -> AssetCacheResult<RunReport>
    where
        S: Stream<Item = Input>,
        C: Future<Output = ()>,
    {
        let recorder = self.recording.then(|| self.filter.recorder());
        let outcomes = inputs
            .map(|input| self.process_one(input, recorder.as_ref()))
            .buffer_unordered(self.concurrency);
        tokio::pin!(outcomes);
        tokio::pin!(cancel);

        let mut report = RunReport::default();
        loop {
            tokio::select! {
                next = outcomes.next() => match next {
                    Some(Ok(outcome)) => report.push(outcome),
                    Some(Err(e)) => {
                        Self::abort(recorder.as_ref());
                        return Err(e);
                    }
                    None => break,
                },
                _ = &mut cancel => {
                    Self::abort(recorder.as_ref());
                    return Err(AssetCacheError::Aborted("cancelled".to_string()));
                }
            }
        }

        if let Some(recorder) = &recorder {
            report.entries = recorder.finish().await?;
            report.flushed = true;
        }

        info!(
            "{} forwarded, {} cached, {} failed",
            report.forwarded.len(),
            report.suppressed.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn abort(recorder: Option<&RecorderStage>) {
        match recorder {
            Some(recorder) => recorder.abort(),
            None => warn!("Run aborted"),
        }
    }

    async fn process_one(
        &self,
        input: Input,
        recorder: Option<&RecorderStage>,
    ) -> AssetCacheResult<Outcome> {
        let record = match input {
            Input::Record(record) => record,
            Input::File(path) => match Record::from_file(&path).await {
                Ok(record) => record,
                Err(error) if error.is_record_scoped() => {
                    return Self::keep_previous(path, error, recorder).await;
                }
                Err(error) => return Err(error),
            },
        };
        let path = record.path().to_path_buf();

        let decision = match self.filter.process(record).await {
            Ok(decision) => decision,
            Err(error) if error.is_record_scoped() => {
                return Self::keep_previous(path, error, recorder).await;
            }
            Err(error) => return Err(error),
        };

        let mut record = match decision {
            Decision::Skip => return Ok(Outcome::Skipped),
            Decision::Suppress { key, fingerprint } => {
                if let Some(recorder) = recorder {
                    recorder.retain(key.clone(), fingerprint).await?;
                }
                return Ok(Outcome::Suppressed(key));
            }
            Decision::Forward(record) => record,
        };

        for transform in &self.transforms {
            debug!("Applying {} to {}", transform.name(), path.display());
            record = transform.apply(record).await?;
        }

        if let Some(recorder) = recorder {
            record = match recorder.process(record).await {
                Ok(record) => record,
                Err(error) if error.is_record_scoped() => {
                    return Ok(Outcome::Failed(RecordError { path, error }));
                }
                Err(error) => return Err(error),
            };
        }

        Ok(Outcome::Forwarded(record))
    }

    /// Record-scoped failure before the recorder: the key keeps its
    /// persisted fingerprint
    async fn keep_previous(
        path: PathBuf,
        error: AssetCacheError,
        recorder: Option<&RecorderStage>,
    ) -> AssetCacheResult<Outcome> {
        warn!("{}", error);
        if let Some(recorder) = recorder {
            recorder.retain_previous(&path).await?;
        }
        Ok(Outcome::Failed(RecordError { path, error }))
    }
}
