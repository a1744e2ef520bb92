//! Wire format exchanged between the relay hub and its clients.
//!
//! Every WebSocket text frame carries exactly one JSON message. Clients send
//! [`ClientFrame`]s; the hub answers with [`ServerFrame`]s, which are either a
//! relayed event or a control frame (`welcome` / `error`).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of client populations.
///
/// Assigned once at handshake from the authenticated identity and never
/// re-derived from payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Operator,
    Staff,
    Enduser,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Operator, Role::Staff, Role::Enduser];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Operator => "OPERATOR",
            Role::Staff => "STAFF",
            Role::Enduser => "ENDUSER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPERATOR" => Ok(Role::Operator),
            "STAFF" => Ok(Role::Staff),
            "ENDUSER" => Ok(Role::Enduser),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The closed set of relayed event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LocationUpdate,
    ChatMessage,
    TripStatus,
    CheckIn,
    CheckOut,
    EmergencyAlert,
    Typing,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::LocationUpdate,
        EventType::ChatMessage,
        EventType::TripStatus,
        EventType::CheckIn,
        EventType::CheckOut,
        EventType::EmergencyAlert,
        EventType::Typing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LocationUpdate => "location_update",
            EventType::ChatMessage => "chat_message",
            EventType::TripStatus => "trip_status",
            EventType::CheckIn => "check_in",
            EventType::CheckOut => "check_out",
            EventType::EmergencyAlert => "emergency_alert",
            EventType::Typing => "typing",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {s}"))
    }
}

/// Client → server event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    pub r#type: EventType,
    pub payload: Value,
}

/// Authenticated attribution attached by the hub to every relayed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub user_id: String,
    pub role: Role,
}

/// Server → client copy of an event, stamped by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedEvent {
    pub r#type: EventType,
    pub payload: Value,
    /// Server timestamp (milliseconds since epoch)
    pub timestamp: i64,
    pub sender: SenderInfo,
}

/// Reason codes carried by `error` control frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The event type is not permitted for the sender's role
    NotPermitted,
    /// The payload lacks a field the fan-out rule needs
    InvalidPayload,
    /// The frame could not be parsed as `{type, payload}`
    MalformedFrame,
}

/// Server → client frames that are not relayed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlFrame {
    /// Sent once, after the connection has joined its rooms
    Welcome {
        connection_id: String,
        user_id: String,
        role: Role,
    },
    /// Sent to the offending connection only
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_type: Option<EventType>,
    },
}

/// Anything the hub may send down a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Event(RelayedEvent),
    Control(ControlFrame),
}
