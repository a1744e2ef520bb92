//! Server startup errors.

use thiserror::Error;

use crate::infrastructure::auth::TokenSpecError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid token configuration: {0}")]
    TokenConfig(#[from] TokenSpecError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
