//! Local backup writer: the last-resort recovery path.
//!
//! Every snapshot serializes the full message set to a new timestamped file;
//! files are never rewritten, so the most recent backup is always the
//! lexicographically greatest filename.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::Result;
use crate::models::message::ChatMessage;

const BACKUP_PREFIX: &str = "messages-";
const BACKUP_SUFFIX: &str = ".json";

/// On-disk snapshot format.
#[derive(Debug, Serialize, Deserialize)]
struct BackupPayload {
    /// ISO 8601 timestamp of when the backup was created.
    created_at: String,
    /// App version that produced the backup.
    version: String,
    messages: Vec<ChatMessage>,
}

pub struct BackupStore {
    dir: PathBuf,
    /// Disambiguates snapshots written within the same millisecond.
    seq: AtomicU64,
}

impl BackupStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the full message set to a fresh snapshot file. Returns the path
    /// of the file written.
    pub async fn snapshot(&self, messages: &[ChatMessage]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let now = chrono::Utc::now();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        // Fixed-width fields keep lexicographic order equal to creation order.
        let name = format!(
            "{BACKUP_PREFIX}{:013}-{seq:06}{BACKUP_SUFFIX}",
            now.timestamp_millis()
        );
        let path = self.dir.join(name);

        let payload = BackupPayload {
            created_at: now.to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            messages: messages.to_vec(),
        };
        let body = serde_json::to_vec(&payload)?;
        fs::write(&path, body).await?;

        debug!(path = %path.display(), count = messages.len(), "backup snapshot written");
        Ok(path)
    }

    /// Load the most recent parseable snapshot. A corrupt file is skipped and
    /// the next-most-recent one is tried; returns `None` when no snapshot can
    /// be read.
    pub async fn load_latest(&self) -> Result<Option<Vec<ChatMessage>>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        for name in names.iter().rev() {
            let path = self.dir.join(name);
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(path = %path.display(), %err, "unreadable backup skipped");
                    continue;
                }
            };
            match serde_json::from_slice::<BackupPayload>(&bytes) {
                Ok(payload) => {
                    debug!(path = %path.display(), count = payload.messages.len(), "backup loaded");
                    return Ok(Some(payload.messages));
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "corrupt backup skipped");
                }
            }
        }

        Ok(None)
    }
}
