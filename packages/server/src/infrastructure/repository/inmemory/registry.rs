//! InMemory ConnectionRegistry 実装
//!
//! ドメイン層が定義する ConnectionRegistry trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! Each room carries its own `RwLock`: join/leave take the write lock,
//! delivery takes read locks one room at a time, so independent rooms never
//! contend. Every connection handle also owns a gate that removal closes
//! before leaving its rooms; delivery only hands a frame over while the gate
//! is open. A room is dropped from the map once its last member leaves.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock as StdRwLock},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, mpsc::error::TrySendError};

use crate::domain::{
    Connection, ConnectionId, ConnectionRegistry, DeliveryReport, OutboundSender,
    RepositoryError, RoomName,
};

type Members = HashMap<ConnectionId, Arc<ConnectionHandle>>;

/// Registry-side view of a live connection.
struct ConnectionHandle {
    connection: Connection,
    sender: OutboundSender,
    /// `true` while frames may be handed to `sender`
    open: StdRwLock<bool>,
}

enum HandOff {
    Delivered,
    QueueFull,
    Closed,
}

impl ConnectionHandle {
    fn new(connection: Connection, sender: OutboundSender) -> Self {
        Self {
            connection,
            sender,
            open: StdRwLock::new(true),
        }
    }

    fn try_hand_off(&self, frame: &str) -> HandOff {
        let Ok(open) = self.open.read() else {
            return HandOff::Closed;
        };
        if !*open {
            return HandOff::Closed;
        }
        match self.sender.try_send(frame.to_owned()) {
            Ok(()) => HandOff::Delivered,
            Err(TrySendError::Full(_)) => HandOff::QueueFull,
            Err(TrySendError::Closed(_)) => HandOff::Closed,
        }
    }

    /// Blocks until no hand-off is in progress, then shuts the gate.
    fn close(&self) {
        match self.open.write() {
            Ok(mut open) => *open = false,
            Err(poisoned) => *poisoned.into_inner() = false,
        }
    }
}

/// インメモリ ConnectionRegistry 実装
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Arc<ConnectionHandle>>>,
    rooms: Mutex<HashMap<RoomName, Arc<RwLock<Members>>>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn room(&self, name: &RoomName) -> Option<Arc<RwLock<Members>>> {
        self.rooms.lock().await.get(name).cloned()
    }

    /// Drop `name` from the map if it is still empty under the map lock.
    async fn prune_room(&self, name: &RoomName) {
        let mut rooms = self.rooms.lock().await;
        let empty = match rooms.get(name) {
            Some(room) => room.read().await.is_empty(),
            None => false,
        };
        if empty {
            rooms.remove(name);
            tracing::debug!("Room {} is empty, removed", name);
        }
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(
        &self,
        connection: Connection,
        sender: OutboundSender,
    ) -> Result<(), RepositoryError> {
        let id = connection.id.clone();
        let rooms = connection.rooms();
        let handle = Arc::new(ConnectionHandle::new(connection, sender));

        {
            let mut connections = self.connections.lock().await;
            if connections.contains_key(&id) {
                return Err(RepositoryError::DuplicateConnection(id.to_string()));
            }
            connections.insert(id.clone(), handle.clone());
        }

        for name in &rooms {
            // Join while holding the map lock so a concurrent prune cannot
            // orphan the room between lookup and insert
            let mut map = self.rooms.lock().await;
            let room = map.entry(name.clone()).or_default();
            room.write().await.insert(id.clone(), handle.clone());
            tracing::debug!("Connection '{}' joined {}", id, name);
        }

        Ok(())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Result<Connection, RepositoryError> {
        let handle = self
            .connections
            .lock()
            .await
            .remove(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        handle.close();

        for name in &handle.connection.rooms() {
            let Some(room) = self.room(name).await else {
                continue;
            };
            let now_empty = {
                let mut members = room.write().await;
                members.remove(connection_id);
                members.is_empty()
            };
            tracing::debug!("Connection '{}' left {}", connection_id, name);
            if now_empty {
                self.prune_room(name).await;
            }
        }

        Ok(handle.connection.clone())
    }

    async fn deliver(
        &self,
        rooms: &[RoomName],
        exclude: Option<&ConnectionId>,
        frame: &str,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut seen: HashSet<ConnectionId> = HashSet::new();

        for name in rooms {
            let Some(room) = self.room(name).await else {
                continue;
            };
            let members = room.read().await;
            for (id, handle) in members.iter() {
                if exclude == Some(id) || !seen.insert(id.clone()) {
                    continue;
                }
                match handle.try_hand_off(frame) {
                    HandOff::Delivered => report.delivered.push(id.clone()),
                    HandOff::QueueFull => {
                        tracing::warn!("Outbound queue full for connection '{}', dropping frame", id);
                        report.dropped.push(id.clone());
                    }
                    HandOff::Closed => {
                        tracing::debug!("Connection '{}' is closing, skipping delivery", id);
                    }
                }
            }
        }

        report
    }

    async fn room_members(&self, room: &RoomName) -> Vec<ConnectionId> {
        let Some(room) = self.room(room).await else {
            return Vec::new();
        };
        let mut members: Vec<ConnectionId> = room.read().await.keys().cloned().collect();
        members.sort();
        members
    }

    async fn room_sizes(&self) -> Vec<(RoomName, usize)> {
        let rooms: Vec<(RoomName, Arc<RwLock<Members>>)> = self
            .rooms
            .lock()
            .await
            .iter()
            .map(|(name, room)| (name.clone(), room.clone()))
            .collect();

        let mut sizes = Vec::with_capacity(rooms.len());
        for (name, room) in rooms {
            let size = room.read().await.len();
            if size > 0 {
                sizes.push((name, size));
            }
        }
        sizes.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        sizes
    }

    async fn count_connections(&self) -> usize {
        self.connections.lock().await.len()
    }
}
