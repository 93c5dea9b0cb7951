//! On-disk cache of materialized dependencies.
//!
//! Each transformed dependency is written once to
//! `<cache_dir>/dep-<fingerprint>.mjs` and reused until its source changes.

use crate::error::Error;
use ondemand_util::fs::atomic_write;
use ondemand_util::hash::path_fingerprint;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A dependency's slot in the on-disk cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDependencyFile {
    /// Absolute path of the original source.
    pub source_path: PathBuf,
    /// Fingerprint of `source_path`.
    pub cache_key: String,
    /// Location of the transformed module.
    pub cached_path: PathBuf,
}

impl CachedDependencyFile {
    /// Cache slot for `source_path` under `cache_dir`.
    ///
    /// The key depends only on the path, so two packages installed at the
    /// same path over time share a slot; the mtime check keeps it current.
    #[must_use]
    pub fn new(source_path: &Path, cache_dir: &Path) -> Self {
        let cache_key = path_fingerprint(source_path);
        let cached_path = cache_dir.join(format!("dep-{cache_key}.mjs"));
        Self {
            source_path: source_path.to_path_buf(),
            cache_key,
            cached_path,
        }
    }

    /// Modification time of the cached file, if present.
    pub async fn cached_mtime(&self) -> Option<SystemTime> {
        tokio::fs::metadata(&self.cached_path)
            .await
            .and_then(|m| m.modified())
            .ok()
    }

    /// Whether the cached file exists and is at least as new as the source.
    pub async fn is_fresh(&self) -> bool {
        let Some(cached) = self.cached_mtime().await else {
            return false;
        };
        match tokio::fs::metadata(&self.source_path)
            .await
            .and_then(|m| m.modified())
        {
            Ok(source) => cached >= source,
            Err(_) => false,
        }
    }

    /// Atomically replace the cached file with `code`.
    pub async fn write(&self, code: String) -> Result<(), Error> {
        if let Some(parent) = self.cached_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = self.cached_path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, code.as_bytes()))
            .await
            .map_err(|e| Error::other(format!("cache write task failed: {e}")))??;
        Ok(())
    }

    /// `file:` URL of the cached module.
    #[must_use]
    pub fn url(&self) -> String {
        super::file_url(&self.cached_path)
    }
}
