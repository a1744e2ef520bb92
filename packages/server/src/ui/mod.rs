//! WebSocket relay server implementation.

mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{build_router, build_state, run, serve};
pub use signal::shutdown_signal;
