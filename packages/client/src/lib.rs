//! Convoy relay client.
//!
//! - [`connection`]: the connection state machine and reconnect policy
//! - [`channel`]: [`RelayClient`] and its [`EventChannel`] handle
//! - [`outbox`]: durable storage for mutations made while offline
//! - [`sync`]: replays the outbox through the REST API

pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod outbox;
pub mod sync;

pub use channel::{ConnectionSignal, EventChannel, RelayClient};
pub use config::{ClientConfig, SyncConfig};
pub use connection::{ConnectionState, ReconnectPolicy};
pub use error::{ClientError, OutboxError, StorageError, SyncError};
pub use outbox::{InMemoryOutboxStore, JsonFileOutboxStore, Outbox, OutboxKind, OutboxRecord};
pub use sync::{DrainReport, HttpSubmitter, RestSubmitter, SyncDrainer};
