//! Domain layer error definitions.

use convoy_shared::{ErrorCode, EventType, Role};
use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,

    /// UserId too long error
    #[error("UserId cannot exceed {max} characters (got {actual})")]
    UserIdTooLong { max: usize, actual: usize },

    /// UserId contains characters that would break room naming
    #[error("UserId cannot contain whitespace or ':' (got: {0})")]
    UserIdInvalidCharacter(String),

    /// ConnectionId validation error
    #[error("ConnectionId cannot be empty")]
    ConnectionIdEmpty,
}

/// Errors raised when an event may not be routed.
///
/// Always reported to the sender only, never broadcast.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingPolicyError {
    #[error("'{event_type}' is not permitted for role {role}")]
    NotPermitted { event_type: EventType, role: Role },

    #[error("'{event_type}' payload must be a JSON object")]
    PayloadNotObject { event_type: EventType },

    #[error("'{event_type}' payload requires a non-empty string 'recipientId'")]
    MissingRecipient { event_type: EventType },
}

impl RoutingPolicyError {
    pub fn event_type(&self) -> EventType {
        match self {
            RoutingPolicyError::NotPermitted { event_type, .. }
            | RoutingPolicyError::PayloadNotObject { event_type }
            | RoutingPolicyError::MissingRecipient { event_type } => *event_type,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RoutingPolicyError::NotPermitted { .. } => ErrorCode::NotPermitted,
            RoutingPolicyError::PayloadNotObject { .. }
            | RoutingPolicyError::MissingRecipient { .. } => ErrorCode::InvalidPayload,
        }
    }
}

/// Errors related to the connection registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Connection already registered: {0}")]
    DuplicateConnection(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),
}
