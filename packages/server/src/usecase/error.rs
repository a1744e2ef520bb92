//! UseCase layer error definitions.

use convoy_shared::{ErrorCode, EventType};
use thiserror::Error;

use crate::domain::RoutingPolicyError;

/// Handshake rejected; the connection never enters any room.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no identity token presented")]
    MissingToken,

    #[error("identity token could not be resolved")]
    UnresolvedToken,
}

/// Failure to route a single inbound frame. Reported to the sender only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error(transparent)]
    Policy(#[from] RoutingPolicyError),

    #[error("failed to encode relayed event: {0}")]
    Encode(String),
}

impl RouteError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RouteError::MalformedFrame(_) | RouteError::Encode(_) => ErrorCode::MalformedFrame,
            RouteError::Policy(policy) => policy.code(),
        }
    }

    pub fn event_type(&self) -> Option<EventType> {
        match self {
            RouteError::Policy(policy) => Some(policy.event_type()),
            _ => None,
        }
    }
}
