//! Persistence Module
//!
//! Best-effort JSON snapshots for non-memory strategies: load on
//! `init()`, save on `destroy()`. Failures here are logged and swallowed
//! by the engine; a cache that cannot reach its snapshot file degrades to
//! memory-only behavior instead of failing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::{current_timestamp_ms, CacheEntry};

// == Storage Error ==
/// Snapshot read/write failure. Only ever observed by the engine's
/// lifecycle methods, which log it and carry on.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format invalid: {0}")]
    Format(#[from] serde_json::Error),
}

// == Persisted Snapshot ==
/// On-disk snapshot: entries in least- to most-recently-used order, so a
/// reload reconstructs true recency rather than map iteration order.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub entries: Vec<(String, CacheEntry)>,
    /// Capture time, Unix milliseconds
    pub timestamp: u64,
    /// Capture time, human-readable
    pub saved_at: DateTime<Utc>,
}

impl PersistedSnapshot {
    /// Snapshot of the given entries, stamped now.
    pub fn new(entries: Vec<(String, CacheEntry)>) -> Self {
        Self {
            entries,
            timestamp: current_timestamp_ms(),
            saved_at: Utc::now(),
        }
    }
}

// == Snapshot Store ==
/// One JSON snapshot file per strategy under a configured directory.
pub struct SnapshotStore {
    dir: PathBuf,
    name: String,
}

impl SnapshotStore {
    /// Store writing `<dir>/<name>.snapshot.json`.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.snapshot.json", self.name))
    }

    // == Load ==
    /// Reads the snapshot, `None` when no snapshot exists yet.
    pub async fn load(&self) -> Result<Option<PersistedSnapshot>, StorageError> {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot at {:?}", path);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = serde_json::from_slice(&bytes)?;
        debug!("loaded snapshot from {:?}", path);
        Ok(Some(snapshot))
    }

    // == Save ==
    /// Writes the snapshot, creating the directory if needed.
    pub async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path();
        let bytes = serde_json::to_vec(snapshot)?;
        tokio::fs::write(&path, bytes).await?;

        debug!(
            "saved snapshot with {} entries to {:?}",
            snapshot.entries.len(),
            path
        );
        Ok(())
    }

    /// Directory the snapshot lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<(String, CacheEntry)> {
        vec![
            (
                "older".to_string(),
                CacheEntry::new(b"1".to_vec(), 60_000, false, false, None),
            ),
            (
                "newer".to_string(),
                CacheEntry::new(b"2".to_vec(), 60_000, true, false, None),
            ),
        ]
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), "disk");

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), "disk");

        let snapshot = PersistedSnapshot::new(sample_entries());
        store.save(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.timestamp, snapshot.timestamp);
        let keys: Vec<&str> = loaded.entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["older", "newer"]);
        assert!(loaded.entries[1].1.compressed);
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeper").join("still");
        let store = SnapshotStore::new(&nested, "disk");

        store
            .save(&PersistedSnapshot::new(Vec::new()))
            .await
            .unwrap();

        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), "disk");

        tokio::fs::write(store.path(), b"{broken json")
            .await
            .unwrap();

        assert!(matches!(
            store.load().await,
            Err(StorageError::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_strategy_name_namespaces_files() {
        let dir = tempfile::tempdir().unwrap();
        let disk = SnapshotStore::new(dir.path(), "disk");
        let other = SnapshotStore::new(dir.path(), "session");

        disk.save(&PersistedSnapshot::new(sample_entries()))
            .await
            .unwrap();

        assert!(disk.load().await.unwrap().is_some());
        assert!(other.load().await.unwrap().is_none());
    }
}
