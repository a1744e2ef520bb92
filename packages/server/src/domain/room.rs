//! Logical multicast groups used to compute delivery targets.

use std::fmt;

use convoy_shared::Role;
use serde::{Serialize, Serializer};

use super::value_object::UserId;

/// Name of a room: one per role and one per user.
///
/// Rendered as `role:<ROLE>` or `user:<userId>`; server-internal and never
/// sent on the wire as a routing input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomName {
    Role(Role),
    User(UserId),
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomName::Role(role) => write!(f, "role:{role}"),
            RoomName::User(user_id) => write!(f, "user:{user_id}"),
        }
    }
}

impl Serialize for RoomName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
