//! Connection registry abstraction.
//!
//! The UseCase layer depends on this trait, not on the in-memory
//! implementation (dependency inversion).

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    entity::Connection,
    error::RepositoryError,
    room::RoomName,
    value_object::ConnectionId,
};

/// Bounded per-connection outbound queue of serialized frames.
pub type OutboundSender = mpsc::Sender<String>;

/// Result of a single fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Connections whose queue accepted the frame
    pub delivered: Vec<ConnectionId>,
    /// Connections whose queue was full; the frame was dropped for them
    pub dropped: Vec<ConnectionId>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Enroll a connection in exactly its role-room and user-room.
    async fn register(
        &self,
        connection: Connection,
        sender: OutboundSender,
    ) -> Result<(), RepositoryError>;

    /// Remove a connection from every room.
    ///
    /// Once this call starts, no further frame is handed to the connection.
    async fn unregister(&self, connection_id: &ConnectionId) -> Result<Connection, RepositoryError>;

    /// Hand `frame` to every live member of `rooms`, each at most once.
    ///
    /// Never waits on a peer's queue; membership is read at call time.
    async fn deliver(
        &self,
        rooms: &[RoomName],
        exclude: Option<&ConnectionId>,
        frame: &str,
    ) -> DeliveryReport;

    /// Current members of a room.
    async fn room_members(&self, room: &RoomName) -> Vec<ConnectionId>;

    /// Non-empty rooms with their member count, sorted by room name.
    async fn room_sizes(&self) -> Vec<(RoomName, usize)>;

    async fn count_connections(&self) -> usize;
}
