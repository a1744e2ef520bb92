//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use convoy_shared::time::{current_timestamp_millis, timestamp_to_rfc3339};

use crate::{
    infrastructure::dto::http::{RoomListDto, RoomSummaryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Diagnostic endpoint listing non-empty rooms and their member counts
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListDto> {
    let rooms = state
        .registry
        .room_sizes()
        .await
        .into_iter()
        .map(|(name, members)| RoomSummaryDto {
            name: name.to_string(),
            members,
        })
        .collect();

    Json(RoomListDto {
        connections: state.registry.count_connections().await,
        rooms,
        generated_at: timestamp_to_rfc3339(current_timestamp_millis()),
    })
}
