//! Best-effort secondary object store.
//!
//! Mirrors individual messages as blobs when the primary store rejects a
//! write. Failures here are logged by the caller and never block the
//! broadcast path.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{Result, StoreError};

/// Contract for the secondary store: opaque blobs addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<()>;
    async fn read_blob(&self, key: &str) -> Result<Vec<u8>>;
}

/// Filesystem-backed implementation. A hosted object store would slot in
/// behind the same trait.
pub struct FsObjectStore {
    base_path: PathBuf,
}

impl FsObjectStore {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;
        info!(path = %base_path.display(), "mirror store initialized");
        Ok(Self { base_path })
    }

    /// Reject keys with path separators or traversal components.
    fn safe_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.safe_path(key)?;
        fs::write(&path, bytes).await?;
        debug!(key, size = bytes.len(), "mirrored blob");
        Ok(())
    }

    async fn read_blob(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.safe_path(key)?;
        let data = fs::read(&path).await?;
        Ok(data)
    }
}
