//! Error types for asset-cache
//!
//! All modules use `AssetCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for asset-cache operations
pub type AssetCacheResult<T> = Result<T, AssetCacheError>;

/// All errors that can occur in asset-cache
#[derive(Error, Debug)]
pub enum AssetCacheError {
    // Record errors
    #[error("Streams are not supported: {}", path.display())]
    StreamingUnsupported { path: PathBuf },

    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache file errors
    #[error("Failed to write cache file {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache file {} was already flushed in this run", path.display())]
    AlreadyFlushed { path: PathBuf },

    #[error("Recorder no longer accepts records")]
    RecorderClosed,

    #[error("Run aborted: {0}")]
    Aborted(String),

    #[error("Transform {name} failed: {reason}")]
    Transform { name: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {}: {source}", path.display())]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl AssetCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a stat error for a record path
    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// Create a read error for a record path
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a transform error
    pub fn transform(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transform {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error belongs to a single record and leaves the run intact
    ///
    /// Record-scoped errors are collected into the run report; everything
    /// else aborts the run and suppresses the flush.
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, Self::Stat { .. } | Self::Read { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StreamingUnsupported { .. } => {
                Some("Read the file into memory before handing it to the cache")
            }
            Self::Flush { .. } => Some("Check that the cache file location is writable"),
            Self::AlreadyFlushed { .. } => {
                Some("Use a fresh pipeline for each run; the cache is written once")
            }
            Self::ConfigInvalid { .. } => Some("Run: asset-cache config show"),
            Self::Aborted(_) => Some("The previous cache file was left untouched"),
            _ => None,
        }
    }
}
