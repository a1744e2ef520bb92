use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    record::{OutboxRecord, sort_by_creation},
    store::OutboxStore,
};
use crate::error::StorageError;

/// Volatile store for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryOutboxStore {
    records: Mutex<HashMap<String, OutboxRecord>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn insert(&self, record: OutboxRecord) -> Result<(), StorageError> {
        self.records.lock().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<OutboxRecord>, StorageError> {
        let mut records: Vec<OutboxRecord> = self.records.lock().await.values().cloned().collect();
        sort_by_creation(&mut records);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<OutboxRecord>, StorageError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.records.lock().await.remove(id).is_some())
    }
}
