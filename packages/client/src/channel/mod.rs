//! Event Channel: typed send/receive over the relay connection.
//!
//! [`RelayClient`] owns a driver task; [`EventChannel`] is the cloneable
//! handle business code uses to connect, send, and register handlers.

mod dispatch;
mod driver;

use std::{
    sync::{Arc, PoisonError},
    time::Duration,
};

use convoy_shared::{ClientFrame, ErrorCode, EventType, RelayedEvent};
use serde_json::Value;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::tungstenite::Message;

pub use dispatch::EventHandler;
use dispatch::Shared;
use driver::{Command, Driver};

use crate::{config::ClientConfig, connection::ConnectionState, error::ClientError};

const SIGNAL_CAPACITY: usize = 64;

/// Lifecycle notifications delivered to [`EventChannel::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
    StateChanged(ConnectionState),
    /// The relay enrolled this connection
    Welcome { connection_id: String },
    /// The relay rejected a frame this client sent
    ServerError { code: ErrorCode, message: String },
    /// Terminal failure: the reconnect budget is spent
    RetriesExhausted { attempts: u32 },
}

/// Owner of one relay connection.
///
/// Each instance runs its own driver task, so several clients can coexist in
/// one process. Must be created inside a tokio runtime.
pub struct RelayClient {
    channel: EventChannel,
    driver: JoinHandle<()>,
}

impl RelayClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let handshake_url = config.handshake_url()?.to_string();
        let shared = Arc::new(Shared::new(SIGNAL_CAPACITY));
        let (commands, command_rx) = mpsc::unbounded_channel();

        let driver = Driver::new(config, handshake_url, command_rx, shared.clone());
        let driver = tokio::spawn(driver.run());

        Ok(Self {
            channel: EventChannel { commands, shared },
            driver,
        })
    }

    pub fn channel(&self) -> EventChannel {
        self.channel.clone()
    }

    /// Disconnect and wait for the driver task to finish.
    pub async fn shutdown(self) {
        self.channel.shutdown();
        if let Err(e) = self.driver.await {
            tracing::error!("Connection driver panicked: {}", e);
        }
    }
}

#[derive(Clone)]
pub struct EventChannel {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
}

impl EventChannel {
    /// Open the connection. No-op while CONNECTING or CONNECTED.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Stop the driver. Every handle becomes inert.
    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Wait until the channel reaches `target`. Returns false on timeout.
    pub async fn wait_for_state(&self, target: ConnectionState, limit: Duration) -> bool {
        let mut rx = self.shared.state.subscribe();
        matches!(
            tokio::time::timeout(limit, rx.wait_for(|state| *state == target)).await,
            Ok(Ok(_))
        )
    }

    /// Hand one event to the transport.
    ///
    /// Returns false without sending when not CONNECTED; the caller routes the
    /// mutation to the outbox instead.
    pub fn send(&self, event_type: EventType, payload: Value) -> bool {
        if self.state() != ConnectionState::Connected {
            tracing::debug!("Not connected; {} not sent", event_type);
            return false;
        }

        let frame = ClientFrame {
            r#type: event_type,
            payload,
        };
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode {}: {}", event_type, e);
                return false;
            }
        };

        let outbound = self
            .shared
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = outbound.as_ref() else {
            return false;
        };
        match tx.try_send(Message::Text(text.into())) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Outbound queue refused {}: {}", event_type, e);
                false
            }
        }
    }

    /// Register a handler for one event type. Handlers accumulate.
    pub fn on_event<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&RelayedEvent) + Send + Sync + 'static,
    {
        self.shared.handlers.register(event_type, Arc::new(handler));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.shared.signals.subscribe()
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Driver already stopped; {:?} ignored", command);
        }
    }
}
