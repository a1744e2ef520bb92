//! Durable Outbox: mutations created while offline, kept until the REST
//! path acknowledges them.

mod json_file;
mod memory;
mod record;
mod store;

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use convoy_shared::time::current_timestamp_millis;
use serde_json::Value;
use uuid::Uuid;

pub use json_file::JsonFileOutboxStore;
pub use memory::InMemoryOutboxStore;
pub use record::{OutboxKind, OutboxRecord};
pub use store::OutboxStore;

use crate::error::OutboxError;

pub struct Outbox {
    store: Arc<dyn OutboxStore>,
    next_sequence: AtomicU64,
    /// Ids currently being submitted by some drain
    in_flight: Mutex<HashSet<String>>,
}

impl Outbox {
    /// Wrap a store, continuing the sequence after any records it already holds.
    pub async fn open(store: Arc<dyn OutboxStore>) -> Result<Self, OutboxError> {
        let next_sequence = store
            .list()
            .await?
            .iter()
            .map(|record| record.sequence + 1)
            .max()
            .unwrap_or(0);
        Ok(Self {
            store,
            next_sequence: AtomicU64::new(next_sequence),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Persist a mutation. A storage failure is returned to the caller.
    pub async fn enqueue(&self, kind: OutboxKind, payload: Value) -> Result<String, OutboxError> {
        let record = OutboxRecord {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            created_at: current_timestamp_millis(),
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
        };
        let id = record.id.clone();
        self.store.insert(record).await?;
        tracing::debug!("Queued {:?} record '{}' for sync", kind, id);
        Ok(id)
    }

    /// Pending records, oldest first.
    pub async fn pending(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<OutboxRecord>, OutboxError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn len(&self) -> Result<usize, OutboxError> {
        Ok(self.store.list().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, OutboxError> {
        Ok(self.len().await? == 0)
    }

    /// Mark a record in flight. `None` if another drain already holds it.
    pub(crate) fn try_claim(&self, id: &str) -> Option<InFlightClaim<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(id.to_string()) {
            return None;
        }
        Some(InFlightClaim {
            outbox: self,
            id: id.to_string(),
        })
    }

    /// Delete an acknowledged record.
    pub(crate) async fn complete(&self, id: &str) -> Result<bool, OutboxError> {
        Ok(self.store.remove(id).await?)
    }
}

/// Releases the in-flight mark on drop.
pub(crate) struct InFlightClaim<'a> {
    outbox: &'a Outbox,
    id: String,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .outbox
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.remove(&self.id);
    }
}
