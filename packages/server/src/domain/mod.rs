//! Domain layer for the relay hub.
//!
//! This module contains the routing rules and the connection model, kept
//! independent of the WebSocket transport and wire DTOs.

pub mod entity;
pub mod error;
pub mod factory;
pub mod fanout;
pub mod identity;
pub mod repository;
pub mod room;
pub mod value_object;

pub use entity::{Connection, Identity};
pub use error::{RepositoryError, RoutingPolicyError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use fanout::{FanoutPlan, FanoutPolicy};
pub use identity::IdentityResolver;
pub use repository::{ConnectionRegistry, DeliveryReport, OutboundSender};
pub use room::RoomName;
pub use value_object::{ConnectionId, Timestamp, UserId};
