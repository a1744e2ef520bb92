use std::time::Duration;

use thiserror::Error;

/// Errors raised while setting up or driving the relay connection.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to open connection: {0}")]
    Connect(String),

    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Connection driver has stopped")]
    DriverStopped,
}

/// Failures of the local persisted store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupted store contents: {0}")]
    Corrupted(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A REST submission that did not succeed. The record stays in the outbox.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server rejected submission with status {status}")]
    Rejected { status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SyncError::Timeout
        } else {
            SyncError::Transport(e.to_string())
        }
    }
}
