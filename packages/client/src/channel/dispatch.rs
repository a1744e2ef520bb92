//! Inbound frame handling shared between the driver task and the handles.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use convoy_shared::{ControlFrame, EventType, RelayedEvent, ServerFrame};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

use super::ConnectionSignal;
use crate::connection::ConnectionState;

/// Callback registered with [`super::EventChannel::on_event`].
pub type EventHandler = Arc<dyn Fn(&RelayedEvent) + Send + Sync>;

/// Handlers keyed by event type; each list keeps registration order.
#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: Mutex<HashMap<EventType, Vec<EventHandler>>>,
}

impl HandlerTable {
    pub(crate) fn register(&self, event_type: EventType, handler: EventHandler) {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        handlers.entry(event_type).or_default().push(handler);
    }

    /// Invoke every handler registered for the event's type. Returns how many ran.
    pub(crate) fn dispatch(&self, event: &RelayedEvent) -> usize {
        // Snapshot so a handler may register further handlers without deadlocking
        let snapshot = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            handlers.get(&event.r#type).cloned().unwrap_or_default()
        };
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }
}

/// State owned by the driver and observed by every [`super::EventChannel`].
pub(crate) struct Shared {
    pub(crate) state: watch::Sender<ConnectionState>,
    /// Sender into the live connection's writer; `None` unless CONNECTED
    pub(crate) outbound: Mutex<Option<mpsc::Sender<Message>>>,
    pub(crate) handlers: HandlerTable,
    pub(crate) signals: broadcast::Sender<ConnectionSignal>,
}

impl Shared {
    pub(crate) fn new(signal_capacity: usize) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (signals, _) = broadcast::channel(signal_capacity);
        Self {
            state,
            outbound: Mutex::new(None),
            handlers: HandlerTable::default(),
            signals,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn emit(&self, signal: ConnectionSignal) {
        // No subscribers is not an error
        let _ = self.signals.send(signal);
    }

    /// Publish a state change. Emits `StateChanged` only when the value moved.
    pub(crate) fn publish_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!("Connection state -> {}", next);
            self.emit(ConnectionSignal::StateChanged(next));
        }
    }

    pub(crate) fn set_outbound(&self, sender: Option<mpsc::Sender<Message>>) -> Option<mpsc::Sender<Message>> {
        let mut outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *outbound, sender)
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed frames are dropped with a warning and never reach handlers.
    pub(crate) fn handle_text(&self, text: &str) {
        let frame = match serde_json::from_str::<ServerFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        match frame {
            ServerFrame::Event(event) => {
                let invoked = self.handlers.dispatch(&event);
                tracing::trace!("Dispatched {} to {} handler(s)", event.r#type, invoked);
            }
            ServerFrame::Control(ControlFrame::Welcome {
                connection_id,
                user_id,
                role,
            }) => {
                tracing::info!("Joined relay as {} ({}), connection '{}'", user_id, role, connection_id);
                self.emit(ConnectionSignal::Welcome { connection_id });
            }
            ServerFrame::Control(ControlFrame::Error {
                code,
                message,
                event_type,
            }) => {
                tracing::warn!("Relay rejected {:?}: {}", event_type, message);
                self.emit(ConnectionSignal::ServerError { code, message });
            }
        }
    }
}
