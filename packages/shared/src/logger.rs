//! Logger setup shared by the server and client binaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence. Without it, the given crate/binary logs at
/// `default_level` and everything else at `info`.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let crate_name = bin_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("info,{crate_name}={default_level},convoy_shared={default_level},tower_http=debug").into()
    });

    // Ignore the error when a subscriber is already installed (e.g. in tests)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
