//! Test fixtures: an in-process relay hub, a stub REST API, and helpers for
//! observing an `EventChannel`.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU16, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    routing::post,
};
use convoy_client::{ClientConfig, ConnectionSignal, EventChannel, RelayClient};
use convoy_server::{ServerConfig, ui};
use convoy_shared::{EventType, RelayedEvent};
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};

pub const TOKENS: [&str; 4] = [
    "tok-op=op-1:OPERATOR",
    "tok-staff=driver-7:STAFF",
    "tok-rider=parent-1:ENDUSER",
    "tok-rider2=parent-2:ENDUSER",
];

pub const WAIT: Duration = Duration::from_secs(5);

/// Spawn an axum app on an ephemeral port, stopped on drop.
struct Served {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Drop for Served {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

pub struct TestServer {
    served: Served,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = ServerConfig {
            tokens: TOKENS.iter().map(|t| t.to_string()).collect(),
            ..ServerConfig::default()
        };
        let state = ui::build_state(&config).expect("Failed to build state");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            ui::serve(listener, state, shutdown)
                .await
                .expect("Server failed");
        });

        Self {
            served: Served {
                addr,
                shutdown: Some(shutdown_tx),
                handle,
            },
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.served.addr)
    }

    pub fn client_config(&self, token: &str) -> ClientConfig {
        ClientConfig::new(self.ws_url(), token)
            .with_reconnect(Duration::from_millis(100), 3)
    }

    /// Live connection count as reported by `/api/rooms`.
    pub async fn connection_count(&self) -> u64 {
        let body: Value = reqwest::get(format!("http://{}/api/rooms", self.served.addr))
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        body["connections"].as_u64().expect("connections missing")
    }
}

/// A WebSocket URL nothing listens on.
pub async fn dead_ws_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read local addr");
    drop(listener);
    format!("ws://{addr}/ws")
}

/// One request received by the stub REST API.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub idempotency_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct StubState {
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    attendance_status: Arc<AtomicU16>,
}

/// REST API standing in for `/messages` and `/attendance`.
pub struct StubApi {
    served: Served,
    state: StubState,
}

impl StubApi {
    pub async fn start() -> Self {
        let state = StubState::default();
        state.attendance_status.store(201, Ordering::SeqCst);

        let app = Router::new()
            .route("/api/messages", post(record_request))
            .route("/api/attendance", post(record_attendance))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Stub API failed");
        });

        Self {
            served: Served {
                addr,
                shutdown: Some(shutdown_tx),
                handle,
            },
            state,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.served.addr)
    }

    /// Make `/attendance` answer with `status` from now on.
    pub fn set_attendance_status(&self, status: u16) {
        self.state.attendance_status.store(status, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state.received.lock().unwrap().clone()
    }
}

fn capture(state: &StubState, uri: &Uri, headers: &HeaderMap, body: Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.received.lock().unwrap().push(ReceivedRequest {
        path: uri.path().to_string(),
        idempotency_key: header("idempotency-key"),
        authorization: header("authorization"),
        body,
    });
}

async fn record_request(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    capture(&state, &uri, &headers, body);
    StatusCode::CREATED
}

async fn record_attendance(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    capture(&state, &uri, &headers, body);
    StatusCode::from_u16(state.attendance_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Start a client and wait until the hub has welcomed it.
pub async fn connected_client(server: &TestServer, token: &str) -> (RelayClient, EventChannel) {
    let client = RelayClient::new(server.client_config(token)).expect("Invalid config");
    let channel = client.channel();
    let mut signals = channel.subscribe();
    channel.connect();
    // welcome is sent only after the hub has enrolled the connection
    let welcome = wait_for_signal(&mut signals, |s| {
        matches!(s, ConnectionSignal::Welcome { .. })
    })
    .await;
    assert!(welcome.is_some(), "client with {token} never joined");
    assert_eq!(channel.state(), convoy_client::ConnectionState::Connected);
    (client, channel)
}

/// Forward every event of `event_type` into a receiver.
pub fn collect_events(
    channel: &EventChannel,
    event_type: EventType,
) -> mpsc::UnboundedReceiver<RelayedEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    channel.on_event(event_type, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

pub async fn recv_event(rx: &mut mpsc::UnboundedReceiver<RelayedEvent>) -> Option<RelayedEvent> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

pub async fn expect_no_event(rx: &mut mpsc::UnboundedReceiver<RelayedEvent>) {
    let event = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(event.is_err(), "Expected no event, got {event:?}");
}

/// Wait for the first signal matching `pred`.
pub async fn wait_for_signal<F>(
    signals: &mut broadcast::Receiver<ConnectionSignal>,
    mut pred: F,
) -> Option<ConnectionSignal>
where
    F: FnMut(&ConnectionSignal) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            match signals.recv().await {
                Ok(signal) if pred(&signal) => return Some(signal),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Poll `f` until it returns true or the timeout elapses.
pub async fn eventually<F, Fut>(mut f: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..40 {
        if f().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
