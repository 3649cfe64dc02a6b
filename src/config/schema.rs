//! Configuration schema for asset-cache
//!
//! Global configuration is stored at `~/.config/asset-cache/config.toml`;
//! a project may override any key in `.asset-cache.toml`.

use crate::cache::DEFAULT_CACHE_FILE;
use crate::pipeline::DEFAULT_CONCURRENCY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache file settings
    pub cache: CacheConfig,

    /// Pipeline settings
    pub pipeline: PipelineConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Cache file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file, relative to the root unless absolute
    pub path: PathBuf,

    /// Directory cache keys are relative to (default: working directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
            root: None,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records processed at once
    pub concurrency: usize,

    /// Hide the per-file cached/uncached lines
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            quiet: false,
        }
    }
}
