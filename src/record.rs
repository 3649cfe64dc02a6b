//! File records flowing through the pipeline

use crate::error::{AssetCacheError, AssetCacheResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncRead;

/// Live byte stream backing a streamed record
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Content held by a record
pub enum Contents {
    /// Marker record with no content
    Null,
    /// Content fully resident in memory
    Buffer(Vec<u8>),
    /// Content still flowing from a live stream
    Stream(ByteStream),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// One logical file in the pipeline
#[derive(Debug)]
pub struct Record {
    path: PathBuf,
    contents: Contents,
    size: Option<u64>,
}

impl Record {
    /// Create a record whose content is already in memory
    pub fn buffered(path: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            contents: Contents::Buffer(contents),
            size: None,
        }
    }

    /// Create a record backed by a live stream
    pub fn streamed(path: impl Into<PathBuf>, stream: ByteStream) -> Self {
        Self {
            path: path.into(),
            contents: Contents::Stream(stream),
            size: None,
        }
    }

    /// Create a marker record with no content
    pub fn null(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: Contents::Null,
            size: None,
        }
    }

    /// Read a file from disk into a buffered record
    ///
    /// The size attribute is taken from the file metadata at read time.
    pub async fn from_file(path: impl Into<PathBuf>) -> AssetCacheResult<Self> {
        let path = path.into();
        let contents = fs::read(&path)
            .await
            .map_err(|e| AssetCacheError::read(&path, e))?;
        let size = contents.len() as u64;

        Ok(Self::buffered(path, contents).with_size(size))
    }

    /// Attach a known byte size (record metadata)
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Filesystem path of the record
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size from the record metadata, if known
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Record content
    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    /// Replace the buffered content, dropping any stale size metadata
    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.contents = Contents::Buffer(contents);
        self.size = None;
    }

    /// Whether this is a marker record with no content
    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    /// Whether the content is a live stream
    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    /// Whether the content is resident in memory
    pub fn is_buffer(&self) -> bool {
        matches!(self.contents, Contents::Buffer(_))
    }

    /// Fail with `StreamingUnsupported` if the content is a live stream
    pub(crate) fn ensure_buffered(&self) -> AssetCacheResult<()> {
        if self.is_stream() {
            return Err(AssetCacheError::StreamingUnsupported {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}
