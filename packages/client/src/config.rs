//! Client configuration.

use std::time::Duration;

use reqwest::Url;

use crate::{
    connection::{DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_INTERVAL, ReconnectPolicy},
    error::ClientError,
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub server_url: String,
    /// Opaque identity token presented at handshake
    pub token: String,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    /// Capacity of the queue between `send()` and the socket writer
    pub outbound_buffer: usize,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }

    pub fn with_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.reconnect_interval = interval;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            interval: self.reconnect_interval,
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Handshake URL with the token carried as the `token` query parameter.
    pub fn handshake_url(&self) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.server_url).map_err(|e| ClientError::InvalidUrl {
            url: self.server_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ClientError::InvalidUrl {
                    url: self.server_url.clone(),
                    reason: format!("unsupported scheme '{other}'"),
                });
            }
        }
        url.query_pairs_mut().append_pair("token", &self.token);
        Ok(url)
    }
}

/// Settings for the REST path used by the sync drainer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the REST API, e.g. `http://127.0.0.1:3000/api`
    pub api_base_url: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl SyncConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
