//! Interactive Convoy client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin convoy-client -- --token s3cret
//! ```
//!
//! Type `<event_type> <json payload>` to send, e.g.
//! `check_in {"studentId": 42, "tripId": 7}`. Chat and attendance events sent
//! while offline go to the outbox and are replayed when the relay is back.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use convoy_client::{
    ClientConfig, ClientError, ConnectionSignal, ConnectionState, EventChannel, HttpSubmitter,
    JsonFileOutboxStore, Outbox, OutboxError, OutboxKind, RelayClient, StorageError, SyncConfig,
    SyncDrainer, SyncError,
};
use convoy_shared::{EventType, logger::setup_logger, time::timestamp_to_rfc3339};
use rustyline::{DefaultEditor, error::ReadlineError};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

#[derive(Debug, Parser)]
#[command(name = "convoy-client", version, about = "Interactive Convoy relay client")]
struct Args {
    /// Relay WebSocket endpoint
    #[arg(long, env = "CONVOY_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Identity token presented at handshake
    #[arg(long, env = "CONVOY_TOKEN")]
    token: String,

    /// Base URL of the REST API the outbox is replayed to
    #[arg(long, env = "CONVOY_API_BASE_URL", default_value = "http://127.0.0.1:3000/api")]
    api_base_url: String,

    /// Directory holding the offline outbox
    #[arg(long, env = "CONVOY_OUTBOX_DIR", default_value = ".convoy-outbox")]
    outbox_dir: PathBuf,

    #[arg(long, env = "CONVOY_RECONNECT_INTERVAL_MS", default_value_t = 3000)]
    reconnect_interval_ms: u64,

    #[arg(long, env = "CONVOY_MAX_RECONNECT_ATTEMPTS", default_value_t = 5)]
    max_reconnect_attempts: u32,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Outbox(#[from] OutboxError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Debug, PartialEq)]
enum Command {
    Send { event_type: EventType, payload: Value },
    Connect,
    Disconnect,
    Status,
    Drain,
    Help,
    Quit,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let store = JsonFileOutboxStore::open(&args.outbox_dir).await?;
    tracing::info!("Outbox stored in {}", store.dir().display());
    let outbox = Arc::new(Outbox::open(Arc::new(store)).await?);

    let mut sync_config = SyncConfig::new(&args.api_base_url);
    sync_config.token = Some(args.token.clone());
    let submitter = HttpSubmitter::new(&sync_config)?;
    let drainer = Arc::new(SyncDrainer::new(outbox.clone(), Arc::new(submitter)));

    let config = ClientConfig::new(&args.url, &args.token).with_reconnect(
        Duration::from_millis(args.reconnect_interval_ms),
        args.max_reconnect_attempts,
    );
    let client = RelayClient::new(config)?;
    let channel = client.channel();

    for event_type in EventType::ALL {
        channel.on_event(event_type, |event| {
            println!(
                "[{}] {} from {} ({}): {}",
                timestamp_to_rfc3339(event.timestamp),
                event.r#type,
                event.sender.user_id,
                event.sender.role,
                event.payload
            );
        });
    }

    tokio::spawn(watch_signals(channel.subscribe(), drainer.clone()));
    channel.connect();

    // rustyline blocks, so it gets its own thread
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        if let Err(e) = read_lines(line_tx) {
            tracing::error!("Input error: {}", e);
        }
    });

    while let Some(line) = line_rx.recv().await {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::Send {
                event_type,
                payload,
            } => send_or_queue(&channel, &outbox, event_type, payload).await?,
            Command::Connect => channel.connect(),
            Command::Disconnect => channel.disconnect(),
            Command::Status => {
                println!(
                    "state: {}, pending outbox records: {}",
                    channel.state(),
                    outbox.len().await?
                );
            }
            Command::Drain => {
                let report = drainer.drain().await?;
                println!(
                    "submitted {}, failed {}, skipped {}",
                    report.submitted.len(),
                    report.failed.len(),
                    report.skipped.len()
                );
            }
            Command::Help => print_help(),
            Command::Quit => break,
        }
    }

    client.shutdown().await;
    Ok(())
}

async fn send_or_queue(
    channel: &EventChannel,
    outbox: &Outbox,
    event_type: EventType,
    payload: Value,
) -> Result<(), OutboxError> {
    if channel.send(event_type, payload.clone()) {
        return Ok(());
    }
    match outbox_kind(event_type) {
        Some(kind) => {
            let id = outbox.enqueue(kind, payload).await?;
            println!("offline: {event_type} queued as {id}");
        }
        None => println!("offline: {event_type} dropped"),
    }
    Ok(())
}

/// Mutations worth keeping while offline.
fn outbox_kind(event_type: EventType) -> Option<OutboxKind> {
    match event_type {
        EventType::ChatMessage => Some(OutboxKind::Message),
        EventType::CheckIn | EventType::CheckOut => Some(OutboxKind::Attendance),
        _ => None,
    }
}

async fn watch_signals(mut signals: broadcast::Receiver<ConnectionSignal>, drainer: Arc<SyncDrainer>) {
    loop {
        match signals.recv().await {
            Ok(ConnectionSignal::StateChanged(state)) => {
                println!("* {state}");
                if state == ConnectionState::Connected {
                    let drainer = drainer.clone();
                    tokio::spawn(async move {
                        if let Err(e) = drainer.drain().await {
                            tracing::error!("Drain failed: {}", e);
                        }
                    });
                }
            }
            Ok(ConnectionSignal::Welcome { connection_id }) => {
                println!("* joined as {connection_id}");
            }
            Ok(ConnectionSignal::ServerError { code, message }) => {
                println!("! relay error ({code:?}): {message}");
            }
            Ok(ConnectionSignal::RetriesExhausted { attempts }) => {
                println!("! gave up after {attempts} attempt(s); type /connect to retry");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Missed {} connection signal(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn read_lines(tx: mpsc::UnboundedSender<String>) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                editor.add_history_entry(line.as_str())?;
                if tx.send(line).is_err() {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                // Closing the channel ends the main loop
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let command = match line {
        "/connect" => Command::Connect,
        "/disconnect" => Command::Disconnect,
        "/status" => Command::Status,
        "/drain" => Command::Drain,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ if line.starts_with('/') => return Err(format!("unknown command: {line}")),
        _ => {
            let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, "{}"));
            let event_type = name.parse::<EventType>()?;
            let payload = serde_json::from_str::<Value>(rest.trim())
                .map_err(|e| format!("invalid JSON payload: {e}"))?;
            Command::Send {
                event_type,
                payload,
            }
        }
    };
    Ok(Some(command))
}

fn print_help() {
    println!("<event_type> <json>   send an event, e.g. check_in {{\"studentId\": 42, \"tripId\": 7}}");
    println!("/connect /disconnect  manage the relay connection");
    println!("/status               connection state and outbox size");
    println!("/drain                replay the outbox now");
    println!("/quit                 exit");
}
