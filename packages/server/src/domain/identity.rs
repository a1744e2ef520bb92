//! Identity resolution seam.
//!
//! The hub never authenticates on its own; an external auth layer maps an
//! opaque token to `{userId, role}`.

use async_trait::async_trait;

use super::entity::Identity;

/// Resolves an opaque identity token presented at handshake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns `None` when the token cannot be resolved.
    async fn resolve(&self, token: &str) -> Option<Identity>;
}
