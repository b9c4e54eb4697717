//! Local-filesystem upload driver.
//!
//! Stores one file per object beneath a base directory, mirroring the
//! slash-separated object name as a relative path. Writes are atomic:
//! data lands in a uniquely named temporary file first, then is renamed
//! into place, so a crashed upload never leaves a half-written object.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::{check_object_name, UploadStore};

/// File-backed upload driver rooted at a base directory.
pub struct LocalStore {
    base_dir: PathBuf,
    // Distinguishes temp files of concurrent puts for the same object
    // (two tasks may race to upload an identical deduplicated chunk).
    tmp_counter: AtomicU64,
}

impl LocalStore {
    /// Create a driver rooted at the given directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    fn object_path(&self, object: &str) -> Result<PathBuf, StoreError> {
        check_object_name(object)?;
        Ok(self.base_dir.join(object))
    }
}

#[async_trait::async_trait]
impl UploadStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn init(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        debug!(base_dir = %self.base_dir.display(), "local store initialized");
        Ok(())
    }

    async fn put(&self, object: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.object_path(object)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("{n}.tmp"));
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(object, size = data.len(), "stored object to file");
        Ok(())
    }

    async fn get(&self, object: &str) -> Result<Option<Bytes>, StoreError> {
        let path = self.object_path(object)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn contains(&self, object: &str) -> Result<bool, StoreError> {
        let path = self.object_path(object)?;
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn teardown(&self) -> Result<(), StoreError> {
        debug!(base_dir = %self.base_dir.display(), "local store torn down");
        Ok(())
    }
}
