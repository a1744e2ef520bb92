//! Test fixtures: an in-process relay hub and a thin WebSocket peer.

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use convoy_server::{ServerConfig, ui};
use convoy_shared::{ClientFrame, ControlFrame, EventType, RelayedEvent, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Tokens known to every test server.
pub const TOKENS: [&str; 6] = [
    "tok-op=op-1:OPERATOR",
    "tok-op2=op-2:OPERATOR",
    "tok-staff=driver-7:STAFF",
    "tok-staff2=driver-8:STAFF",
    "tok-rider=parent-1:ENDUSER",
    "tok-rider2=parent-2:ENDUSER",
];

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
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
            addr,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn ws_url_with_token(&self, token: &str) -> String {
        format!("ws://{}/ws?token={}", self.addr, token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

/// A raw WebSocket peer speaking the wire format.
pub struct Peer {
    pub connection_id: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Peer {
    /// Connect and wait for the `welcome` frame.
    pub async fn connect(server: &TestServer, token: &str) -> Self {
        let (stream, _) = connect_async(server.ws_url_with_token(token))
            .await
            .expect("Failed to connect");
        let mut peer = Self {
            connection_id: String::new(),
            stream,
        };
        match peer.recv_frame().await {
            Some(ServerFrame::Control(ControlFrame::Welcome { connection_id, .. })) => {
                peer.connection_id = connection_id;
            }
            other => panic!("Expected welcome, got {other:?}"),
        }
        peer
    }

    pub async fn send(&mut self, event_type: EventType, payload: serde_json::Value) {
        let frame = ClientFrame {
            r#type: event_type,
            payload,
        };
        self.send_raw(&serde_json::to_string(&frame).unwrap()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("Failed to send");
    }

    /// Next server frame, or `None` when nothing arrives in time.
    pub async fn recv_frame(&mut self) -> Option<ServerFrame> {
        self.recv_frame_within(RECV_TIMEOUT).await
    }

    pub async fn recv_frame_within(&mut self, wait: Duration) -> Option<ServerFrame> {
        loop {
            let msg = tokio::time::timeout(wait, self.stream.next())
                .await
                .ok()??
                .ok()?;
            if let Message::Text(text) = msg {
                return Some(serde_json::from_str(text.as_str()).expect("Invalid server frame"));
            }
        }
    }

    pub async fn recv_event(&mut self) -> Option<RelayedEvent> {
        match self.recv_frame().await? {
            ServerFrame::Event(event) => Some(event),
            ServerFrame::Control(control) => panic!("Expected event, got {control:?}"),
        }
    }

    /// Assert that nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        let frame = self.recv_frame_within(Duration::from_millis(300)).await;
        assert!(frame.is_none(), "Expected silence, got {frame:?}");
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
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
