//! # Disk Cache
//!
//! This module implements the file-based store backing the fetcher. Each
//! entry is a single file named after its [`CacheKey`] and holding the raw
//! fetched bytes verbatim. Entries are written at most once and are never
//! overwritten or removed by this crate.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::key::CacheKey;
use crate::cache::types::{CacheConfig, CacheResult, DEFAULT_CACHE_DIR_NAME};

#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: Option<PathBuf>,
    enabled: bool,
}

impl DiskCache {
    /// Create a new disk cache rooted at the specified directory
    pub fn new(cache_dir: PathBuf, enabled: bool) -> Self {
        Self {
            cache_dir: Some(cache_dir),
            enabled,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            cache_dir: config.disk_cache_path.clone(),
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Directory holding the entries.
    ///
    /// The temp dir is resolved on every call so that a directory reclaimed
    /// by the OS is simply recreated on the next write.
    pub fn root(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME),
        }
    }

    /// Get the path for a cached resource
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root().join(key.as_str())
    }

    /// Whether a regular file exists for `key` right now.
    pub async fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        match fs::metadata(self.entry_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read the full contents stored for `key`, or `None` when absent.
    pub async fn read(&self, key: &CacheKey) -> CacheResult<Option<Bytes>> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.entry_path(key);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read cache data file");
                Err(e)
            }
        }
    }

    /// Store `data` under `key` unless an entry already exists.
    ///
    /// Returns `true` if this call published the entry. The bytes are first
    /// written to a uniquely named temporary file and then linked into place,
    /// so readers never observe a partially written entry and the first
    /// writer for a key wins.
    pub async fn write_if_absent(&self, key: &CacheKey, data: &[u8]) -> CacheResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        if self.exists(key).await? {
            debug!(key = %key, "Cache entry already present, skipping write");
            return Ok(false);
        }

        let root = self.root();
        fs::create_dir_all(&root).await?;

        let data_path = root.join(key.as_str());
        let temp_path = root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&temp_path, data).await {
            warn!(path = ?temp_path, error = %e, "Failed to write cache data file");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        let result = match fs::hard_link(&temp_path, &data_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(key = %key, "Lost race for cache entry, keeping existing data");
                Ok(false)
            }
            Err(e) => {
                // Filesystems without hard links: fall back to check-then-rename.
                debug!(error = %e, "Hard link unavailable, renaming temporary file");
                Self::rename_if_absent(&temp_path, &data_path).await
            }
        };

        let _ = fs::remove_file(&temp_path).await;

        match &result {
            Ok(true) => debug!(key = %key, size = data.len(), "Successfully cached entry to file"),
            Ok(false) => {}
            Err(e) => warn!(
                from = ?temp_path,
                to = ?data_path,
                error = %e,
                "Failed to publish cache entry"
            ),
        }

        result
    }

    async fn rename_if_absent(temp_path: &Path, data_path: &Path) -> CacheResult<bool> {
        if fs::try_exists(data_path).await? {
            return Ok(false);
        }
        fs::rename(temp_path, data_path).await?;
        Ok(true)
    }
}
