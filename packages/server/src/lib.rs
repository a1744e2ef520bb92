//! Role-aware realtime relay hub.
//!
//! Accepts authenticated WebSocket connections, enrolls each one in its
//! role-room and user-room, and fans events out according to per-type rules.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use error::ServerError;
pub use ui::run;
