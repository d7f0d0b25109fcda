//! Local snapshot of the record store, used to survive restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;

use crate::aggregate::RecordStore;
use crate::record::Record;
use crate::{Error, Result, CHECKPOINT_KEY, RECORDS_KEY};

/// Key-value store holding JSON values.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, key: &str, value: &Value) -> Result<()>;
    async fn load(&self, key: &str) -> Result<Option<Value>>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace(['/', '\\'], "__")))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path(key);
        // Write then rename so a crash never leaves half a snapshot behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(value)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let bytes = match fs::read(self.path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::SnapshotCorrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        self.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Where the fetch loop picks up after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub cursor: usize,
    pub has_more: bool,
}

/// What [`PersistenceBridge::restore`] found.
#[derive(Debug, Default)]
pub struct Restored {
    pub store: RecordStore,
    pub checkpoint: Option<Checkpoint>,
}

/// Saves and restores the record store under [`RECORDS_KEY`] and the page
/// cursor under [`CHECKPOINT_KEY`].
///
/// The region tally is never persisted. It is recomputed on restore.
#[derive(Clone)]
pub struct PersistenceBridge {
    store: Arc<dyn SnapshotStore>,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Best-effort save of every record, then of the checkpoint. Failures are
    /// logged and swallowed.
    ///
    /// The checkpoint is only written once the records are, so a restart never
    /// skips pages whose records were lost.
    pub async fn snapshot(&self, records: &[Record], checkpoint: Checkpoint) {
        let saved = match self.save(RECORDS_KEY, records).await {
            Ok(()) => self.save(CHECKPOINT_KEY, &checkpoint).await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            tracing::warn!(error = %e, records = records.len(), "couldn't save snapshot");
        }
    }

    /// Loads the saved records and checkpoint. A corrupt snapshot is dropped
    /// and nothing is restored. Any other read failure leaves the snapshot in
    /// place and starts empty.
    pub async fn restore(&self) -> Restored {
        match self.try_restore().await {
            Ok(restored) => {
                if let Some(checkpoint) = restored.checkpoint {
                    tracing::info!(
                        records = restored.store.len(),
                        cursor = checkpoint.cursor,
                        "restored snapshot"
                    );
                }
                restored
            }
            Err(e @ Error::SnapshotCorrupt { .. }) => {
                tracing::warn!(error = %e, "discarding unreadable snapshot");
                self.clear().await;
                Restored::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "couldn't read snapshot, starting empty");
                Restored::default()
            }
        }
    }

    async fn try_restore(&self) -> Result<Restored> {
        let Some(records) = self.load::<Vec<Record>>(RECORDS_KEY).await? else {
            return Ok(Restored::default());
        };
        let checkpoint = self.load(CHECKPOINT_KEY).await?;
        Ok(Restored {
            store: RecordStore::from_records(records),
            checkpoint,
        })
    }

    pub async fn clear(&self) {
        for key in [RECORDS_KEY, CHECKPOINT_KEY] {
            if let Err(e) = self.store.remove(key).await {
                tracing::warn!(key, error = %e, "couldn't remove snapshot");
            }
        }
    }

    async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store.save(key, &value).await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.store.load(key).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::SnapshotCorrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}
