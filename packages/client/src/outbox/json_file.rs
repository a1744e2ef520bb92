//! JSON file store surviving restarts.
//!
//! One file per collection (`offlineMessages.json`, `offlineAttendance.json`),
//! each a JSON object keyed by record id. Writes go to a sibling temp file
//! that is flushed to disk and then renamed over the target.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};

use super::{
    record::{OutboxKind, OutboxRecord, sort_by_creation},
    store::OutboxStore,
};
use crate::error::StorageError;

type Collection = BTreeMap<String, OutboxRecord>;

pub struct JsonFileOutboxStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileOutboxStore {
    /// Open (creating if needed) the store directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!("Outbox store at {}", dir.display());
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, kind: OutboxKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.collection()))
    }

    async fn load(&self, kind: OutboxKind) -> Result<Collection, StorageError> {
        match tokio::fs::read(self.path(kind)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, kind: OutboxKind, collection: &Collection) -> Result<(), StorageError> {
        let path = self.path(kind);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(collection)?;

        let mut file = File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        sync_dir(&self.dir).await
    }
}

/// Persist the rename itself.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    File::open(dir).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[async_trait]
impl OutboxStore for JsonFileOutboxStore {
    async fn insert(&self, record: OutboxRecord) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let kind = record.kind;
        let mut collection = self.load(kind).await?;
        collection.insert(record.id.clone(), record);
        self.save(kind, &collection).await
    }

    async fn list(&self) -> Result<Vec<OutboxRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut records = Vec::new();
        for kind in OutboxKind::ALL {
            records.extend(self.load(kind).await?.into_values());
        }
        sort_by_creation(&mut records);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<OutboxRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        for kind in OutboxKind::ALL {
            if let Some(record) = self.load(kind).await?.remove(id) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        for kind in OutboxKind::ALL {
            let mut collection = self.load(kind).await?;
            if collection.remove(id).is_some() {
                self.save(kind, &collection).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
