//! # Cache Types
//!
//! This module defines common types used across the caching system.

use std::path::PathBuf;

/// Name of the directory created under the system temp dir when no explicit
/// cache path is configured.
pub(crate) const DEFAULT_CACHE_DIR_NAME: &str = "fetchcache";

/// Configuration for the cache system
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Path for disk cache storage
    pub disk_cache_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disk_cache_path: None, // If None, we'll use system temp dir
        }
    }
}

impl CacheConfig {
    /// Cache rooted at an explicit directory.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            disk_cache_path: Some(path.into()),
        }
    }

    /// Cache turned off; every resolution goes to the network.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            disk_cache_path: None,
        }
    }
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;
