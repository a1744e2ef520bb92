//! The driver task: sole owner of the socket and the state machine.
//!
//! Commands from handles, the open attempt, the reconnect timer and the live
//! link are multiplexed in one `select!` loop, so no two transitions are ever
//! in flight and cancelling a timer is just dropping it.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time::{Sleep, sleep, timeout},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::{ConnectionSignal, dispatch::Shared};
use crate::{
    config::ClientConfig,
    connection::{Action, ConnectionStateMachine},
    error::ClientError,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type OpenFuture = Pin<Box<dyn Future<Output = Result<WsStream, ClientError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Shutdown,
}

/// A live connection: the read half plus the spawned writer.
struct Link {
    reader: SplitStream<WsStream>,
    writer: JoinHandle<()>,
}

enum LinkEvent {
    Text(String),
    Closed { clean: bool },
    Ignored,
}

pub(crate) struct Driver {
    config: ClientConfig,
    handshake_url: String,
    machine: ConnectionStateMachine,
    commands: mpsc::UnboundedReceiver<Command>,
    shared: Arc<Shared>,
    opening: Option<OpenFuture>,
    backoff: Option<Pin<Box<Sleep>>>,
    link: Option<Link>,
}

impl Driver {
    pub(crate) fn new(
        config: ClientConfig,
        handshake_url: String,
        commands: mpsc::UnboundedReceiver<Command>,
        shared: Arc<Shared>,
    ) -> Self {
        let machine = ConnectionStateMachine::new(config.reconnect_policy());
        Self {
            config,
            handshake_url,
            machine,
            commands,
            shared,
            opening: None,
            backoff: None,
            link: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => {
                        let action = self.machine.connect();
                        self.perform(action);
                    }
                    Some(Command::Disconnect) => {
                        let action = self.machine.disconnect();
                        self.perform(action);
                    }
                    // Explicit shutdown, or every handle dropped
                    Some(Command::Shutdown) | None => {
                        let action = self.machine.disconnect();
                        self.perform(action);
                        self.shared.publish_state(self.machine.state());
                        break;
                    }
                },
                result = wait_opening(&mut self.opening) => {
                    self.opening = None;
                    match result {
                        Ok(stream) => self.on_opened(stream),
                        Err(e) => {
                            tracing::warn!("Connection attempt failed: {}", e);
                            let action = self.machine.closed(false);
                            self.perform(action);
                        }
                    }
                },
                () = wait_backoff(&mut self.backoff) => {
                    self.backoff = None;
                    let action = self.machine.backoff_elapsed();
                    self.perform(action);
                },
                event = next_link_event(&mut self.link) => match event {
                    LinkEvent::Text(text) => self.shared.handle_text(&text),
                    LinkEvent::Closed { clean } => {
                        if clean {
                            tracing::info!("Relay closed the connection");
                        } else {
                            tracing::warn!("Connection lost");
                        }
                        self.drop_link();
                        let action = self.machine.closed(clean);
                        self.perform(action);
                    }
                    LinkEvent::Ignored => {}
                },
            }
            self.shared.publish_state(self.machine.state());
        }
        tracing::debug!("Connection driver stopped");
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Open => {
                self.backoff = None;
                tracing::info!("Connecting to {}", self.config.server_url);
                self.opening = Some(open(
                    self.handshake_url.clone(),
                    self.config.connect_timeout,
                ));
            }
            Action::ScheduleReconnect { attempt, delay } => {
                tracing::info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay,
                    attempt,
                    self.config.max_reconnect_attempts
                );
                // Replacing the slot drops any previous timer
                self.backoff = Some(Box::pin(sleep(delay)));
            }
            Action::Close => {
                self.backoff = None;
                self.opening = None;
                self.close_link();
            }
            Action::GiveUp { attempts } => {
                self.backoff = None;
                tracing::error!("Giving up after {} reconnect attempt(s)", attempts);
                self.shared.emit(ConnectionSignal::RetriesExhausted { attempts });
            }
        }
    }

    fn on_opened(&mut self, stream: WsStream) {
        let (sink, reader) = stream.split();
        let (tx, rx) = mpsc::channel::<Message>(self.config.outbound_buffer);
        let writer = tokio::spawn(write_loop(sink, rx, self.config.send_timeout));

        // Writer must be reachable before the state reads CONNECTED
        self.shared.set_outbound(Some(tx));
        self.link = Some(Link { reader, writer });

        self.machine.opened();
        tracing::info!("Connected to {}", self.config.server_url);
    }

    /// Forget the link after it failed or the peer closed it.
    fn drop_link(&mut self) {
        self.shared.set_outbound(None);
        self.link = None;
    }

    /// Close the link deliberately with a close frame.
    fn close_link(&mut self) {
        if let Some(tx) = self.shared.set_outbound(None)
            && tx.try_send(Message::Close(None)).is_err()
        {
            tracing::debug!("Writer queue unavailable; closing without a close frame");
        }
        self.link = None;
    }
}

fn open(url: String, limit: Duration) -> OpenFuture {
    Box::pin(async move {
        match timeout(limit, connect_async(url)).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(ClientError::Connect(e.to_string())),
            Err(_) => Err(ClientError::ConnectTimeout(limit)),
        }
    })
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<Message>,
    send_timeout: Duration,
) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        match timeout(send_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!("Write failed: {}", e);
                break;
            }
            Err(_) => {
                tracing::warn!("Write timed out after {:?}", send_timeout);
                break;
            }
        }
        if closing {
            break;
        }
    }
}

async fn wait_opening(opening: &mut Option<OpenFuture>) -> Result<WsStream, ClientError> {
    match opening {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn wait_backoff(backoff: &mut Option<Pin<Box<Sleep>>>) {
    match backoff {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}

async fn next_link_event(link: &mut Option<Link>) -> LinkEvent {
    let Some(link) = link else {
        return std::future::pending().await;
    };

    tokio::select! {
        message = link.reader.next() => match message {
            Some(Ok(Message::Text(text))) => LinkEvent::Text(text.as_str().to_string()),
            Some(Ok(Message::Close(_))) => LinkEvent::Closed { clean: true },
            Some(Ok(Message::Binary(_))) => {
                tracing::warn!("Dropping unexpected binary frame");
                LinkEvent::Ignored
            }
            // Ping/pong is answered by the protocol layer
            Some(Ok(_)) => LinkEvent::Ignored,
            Some(Err(e)) => {
                tracing::debug!("Read failed: {}", e);
                LinkEvent::Closed { clean: false }
            }
            None => LinkEvent::Closed { clean: false },
        },
        _ = &mut link.writer => LinkEvent::Closed { clean: false },
    }
}
