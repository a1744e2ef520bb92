//! Core domain models for the relay hub.

use convoy_shared::{Role, SenderInfo};
use serde::{Deserialize, Serialize};

use super::{
    room::RoomName,
    value_object::{ConnectionId, Timestamp, UserId},
};

/// Authenticated identity of a connection, resolved once at handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// A live, authenticated connection.
///
/// Created on successful handshake and destroyed on socket close; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, identity: Identity, connected_at: Timestamp) -> Self {
        Self {
            id,
            identity,
            connected_at,
        }
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    /// The rooms this connection belongs to for its whole lifetime:
    /// its role-room and its user-room.
    pub fn rooms(&self) -> [RoomName; 2] {
        [
            RoomName::Role(self.identity.role),
            RoomName::User(self.identity.user_id.clone()),
        ]
    }

    /// Attribution stamped on events this connection emits.
    pub fn sender_info(&self) -> SenderInfo {
        SenderInfo {
            user_id: self.identity.user_id.as_str().to_string(),
            role: self.identity.role,
        }
    }
}
