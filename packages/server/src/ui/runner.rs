//! Router assembly and server entry point.

use std::{future::Future, io, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    error::ServerError,
    infrastructure::{auth::StaticTokenResolver, repository::InMemoryConnectionRegistry},
    ui::{
        handler::{health_check, list_rooms, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
};

/// Build the shared state from configuration.
pub fn build_state(config: &ServerConfig) -> Result<Arc<AppState>, ServerError> {
    let resolver = StaticTokenResolver::from_specs(&config.tokens)?;
    if resolver.is_empty() {
        tracing::warn!("No identity tokens configured; every handshake will be rejected");
    }

    Ok(Arc::new(AppState {
        registry: Arc::new(InMemoryConnectionRegistry::new()),
        resolver: Arc::new(resolver),
        outbound_buffer: config.outbound_buffer.max(1),
    }))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(list_rooms))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Run the relay hub until a shutdown signal arrives.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let state = build_state(&config)?;
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!("Relay hub listening on {}", addr);
    serve(listener, state, shutdown_signal()).await?;
    Ok(())
}
