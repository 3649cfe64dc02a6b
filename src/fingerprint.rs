//! Cache keys and fingerprints
//!
//! A [`CacheKey`] is the slash-separated path of a file relative to a fixed
//! root, so the same logical asset gets the same key no matter which absolute
//! location produced it. A [`Fingerprint`] is derived from the key and the
//! file size only; file contents are never read.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path};

/// Number of digest bytes kept in a fingerprint (32 hex chars)
const FINGERPRINT_BYTES: usize = 16;

/// Normalized relative path identifying a logical asset across runs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for `path` relative to `root`
    ///
    /// Relative paths are taken as relative to `root`. Both sides are
    /// normalized lexically (`.` dropped, `..` folded) without touching the
    /// filesystem. Paths outside the root keep leading `..` segments; paths
    /// on a different drive or prefix keep their absolute form.
    pub fn from_path(root: &Path, path: &Path) -> Self {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };

        let base = LexicalPath::new(root);
        let target = LexicalPath::new(&absolute);

        if base.anchor != target.anchor {
            return Self(target.display());
        }

        let common = base
            .parts
            .iter()
            .zip(&target.parts)
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = Vec::new();
        for _ in common..base.parts.len() {
            segments.push("..");
        }
        segments.extend(target.parts[common..].iter().map(String::as_str));

        if segments.is_empty() {
            return Self(".".to_string());
        }
        Self(segments.join("/"))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque digest of a `(CacheKey, size)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Get the digest as a hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a key and a byte size
///
/// SHA-256 over the key, a newline, then the decimal size; the first
/// 16 bytes are hex encoded. Equal size is used as a proxy for unchanged
/// content, so an edit that keeps the size is not detected.
pub fn fingerprint(key: &CacheKey, size: u64) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(key.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(size.to_string().as_bytes());
    let digest = hasher.finalize();

    Fingerprint(hex::encode(&digest[..FINGERPRINT_BYTES]))
}

/// Render one path segment as UTF-8
///
/// Bytes that are not valid UTF-8 are written as `\xNN`, so distinct
/// non-UTF-8 names map to distinct keys. A valid name that literally
/// contains `\xNN` can still share a key with such a name.
fn segment(name: &OsStr) -> String {
    if let Some(name) = name.to_str() {
        return name.to_string();
    }

    let mut out = String::new();
    for chunk in name.as_encoded_bytes().utf8_chunks() {
        out.push_str(chunk.valid());
        for byte in chunk.invalid() {
            out.push_str(&format!("\\x{:02X}", byte));
        }
    }
    out
}

/// Path split into its anchor (prefix and root) and normalized segments
struct LexicalPath {
    anchor: String,
    parts: Vec<String>,
}

impl LexicalPath {
    fn new(path: &Path) -> Self {
        let mut anchor = String::new();
        let mut parts: Vec<String> = Vec::new();

        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    anchor.push_str(&prefix.as_os_str().to_string_lossy());
                }
                Component::RootDir => anchor.push('/'),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.last().is_some_and(|p| p != "..") {
                        parts.pop();
                    } else if anchor.is_empty() {
                        parts.push("..".to_string());
                    }
                }
                Component::Normal(name) => parts.push(segment(name)),
            }
        }

        Self { anchor, parts }
    }

    fn display(&self) -> String {
        let joined = self.parts.join("/");
        match self.anchor.as_str() {
            "" => joined,
            anchor if anchor.ends_with('/') => format!("{}{}", anchor, joined),
            anchor => format!("{}/{}", anchor, joined),
        }
    }
}
