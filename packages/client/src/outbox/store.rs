use async_trait::async_trait;

use super::record::OutboxRecord;
use crate::error::StorageError;

/// Persistence seam for outbox records.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn insert(&self, record: OutboxRecord) -> Result<(), StorageError>;

    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<OutboxRecord>, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<OutboxRecord>, StorageError>;

    /// Returns whether a record was removed.
    async fn remove(&self, id: &str) -> Result<bool, StorageError>;
}
