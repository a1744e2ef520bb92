//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{Connection, Identity, OutboundSender},
    infrastructure::dto::websocket::{ConnectQuery, encode_control, error_frame, welcome_frame},
    ui::state::AppState,
    usecase::{
        AcceptConnectionUseCase, DisconnectConnectionUseCase, RouteError, RouteEventUseCase,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let token = query.token.or_else(|| bearer_token(&headers));

    // Reject before the upgrade so a failed handshake never joins a room
    let accept_usecase = AcceptConnectionUseCase::new(state.registry.clone(), state.resolver.clone());
    let identity = match accept_usecase.authenticate(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Rejecting handshake: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    // Create a bounded channel for frames routed to this connection
    let (tx, mut rx) = mpsc::channel::<String>(state.outbound_buffer);

    let accept_usecase = AcceptConnectionUseCase::new(state.registry.clone(), state.resolver.clone());
    let connection = match accept_usecase.enroll(identity, tx.clone()).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Failed to enroll connection: {}", e);
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    let welcome = match encode_control(&welcome_frame(&connection)) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to encode welcome for '{}': {}", connection.id, e);
            None
        }
    };

    // Spawn a task that forwards routed frames to this client
    let connection_id = connection.id.clone();
    let mut send_task = tokio::spawn(async move {
        if let Some(welcome) = welcome
            && sender.send(Message::Text(welcome.into())).await.is_err()
        {
            return;
        }
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(frame.into())).await {
                tracing::debug!("Write to '{}' failed: {}", connection_id, e);
                break;
            }
        }
    });

    // Spawn a task to receive events from this client
    let origin = connection.clone();
    let route_usecase = RouteEventUseCase::new(state.registry.clone());
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", origin.id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received from '{}': {}", origin.id, text.as_str());
                    let result = match RouteEventUseCase::parse(text.as_str()) {
                        Ok(frame) => route_usecase.execute(&origin, frame).await.map(|_| ()),
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        report_to_sender(&tx, &origin, &e);
                    }
                }
                Message::Binary(_) => {
                    let e = RouteError::MalformedFrame("binary frames are not supported".to_string());
                    report_to_sender(&tx, &origin, &e);
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", origin.id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let disconnect_usecase = DisconnectConnectionUseCase::new(state.registry.clone());
    match disconnect_usecase.execute(&connection.id).await {
        Ok(_) => tracing::info!(
            "{} connection(s) remain",
            disconnect_usecase.count_remaining_connections().await
        ),
        Err(e) => tracing::warn!("Failed to remove connection '{}': {}", connection.id, e),
    }
}

/// Queue an `error` control frame for the offending connection only.
fn report_to_sender(reply: &OutboundSender, origin: &Connection, error: &RouteError) {
    tracing::warn!("Rejected frame from '{}' ({}): {}", origin.id, origin.role(), error);

    let frame = error_frame(error.code(), error.to_string(), error.event_type());
    match encode_control(&frame) {
        Ok(json) => {
            if reply.try_send(json).is_err() {
                tracing::warn!("Could not queue error report for '{}'", origin.id);
            }
        }
        Err(e) => tracing::error!("Failed to encode error frame: {}", e),
    }
}
