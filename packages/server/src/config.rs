//! Command-line and environment configuration for the relay hub.

use clap::Parser;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Role-aware realtime relay hub
#[derive(Debug, Clone, Parser)]
#[command(name = "convoy-server", version, about = "Role-aware realtime relay hub")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "CONVOY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "CONVOY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Identity token, as TOKEN=USER_ID:ROLE (repeatable)
    #[arg(long = "token", env = "CONVOY_TOKENS", value_delimiter = ',')]
    pub tokens: Vec<String>,

    /// Frames buffered per connection before new frames are dropped for it
    #[arg(long, env = "CONVOY_OUTBOUND_BUFFER", default_value_t = DEFAULT_OUTBOUND_BUFFER)]
    pub outbound_buffer: usize,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tokens: Vec::new(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}
