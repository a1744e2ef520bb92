//! Server state shared by all handlers.

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, IdentityResolver};

/// Shared application state
pub struct AppState {
    /// Live connections and their room membership
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Handshake token → identity
    pub resolver: Arc<dyn IdentityResolver>,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
}
