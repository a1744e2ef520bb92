//! HTTP API response DTOs for the relay hub.

use serde::{Deserialize, Serialize};

/// Room summary for the diagnostic list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub name: String,
    pub members: usize,
}

/// Hub overview for the diagnostic list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListDto {
    pub connections: usize,
    pub rooms: Vec<RoomSummaryDto>,
    pub generated_at: String, // ISO 8601
}
