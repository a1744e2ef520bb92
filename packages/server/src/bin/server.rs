//! Convoy relay hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin convoy-server -- --token s3cret=driver-7:STAFF
//! ```

use clap::Parser;
use convoy_server::ServerConfig;
use convoy_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::parse();

    // Run the server
    if let Err(e) = convoy_server::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
