//! WebSocket handshake and frame DTOs for the relay hub.

use convoy_shared::{ControlFrame, ErrorCode, EventType, RelayedEvent};
use serde::Deserialize;

use crate::domain::Connection;

/// Query parameters for the WebSocket handshake
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub fn welcome_frame(connection: &Connection) -> ControlFrame {
    ControlFrame::Welcome {
        connection_id: connection.id.to_string(),
        user_id: connection.user_id().to_string(),
        role: connection.role(),
    }
}

pub fn error_frame(
    code: ErrorCode,
    message: impl Into<String>,
    event_type: Option<EventType>,
) -> ControlFrame {
    ControlFrame::Error {
        code,
        message: message.into(),
        event_type,
    }
}

pub fn encode_control(frame: &ControlFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}

pub fn encode_event(event: &RelayedEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
