//! UseCase: 接続受付処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AcceptConnectionUseCase::authenticate() / enroll() メソッド
//! - トークン解決と、ロールルーム・ユーザールームへの参加
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの接続
//! - 異常系：トークンなし、解決できないトークン
//!
//! Accept is split in two so the HTTP layer can reject with 401 before the
//! WebSocket upgrade, and enroll only once the socket exists.

use std::sync::Arc;

use crate::domain::{
    Connection, ConnectionIdFactory, ConnectionRegistry, Identity, IdentityResolver,
    OutboundSender, RepositoryError, Timestamp,
};

use super::error::AuthError;

/// 接続受付のユースケース
pub struct AcceptConnectionUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    resolver: Arc<dyn IdentityResolver>,
}

impl AcceptConnectionUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Resolve the handshake token to an identity.
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingToken` - no (or an empty) token was presented
    /// * `AuthError::UnresolvedToken` - the resolver does not know the token
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.resolver
            .resolve(token)
            .await
            .ok_or(AuthError::UnresolvedToken)
    }

    /// Create the connection and enroll it in its role-room and user-room.
    pub async fn enroll(
        &self,
        identity: Identity,
        sender: OutboundSender,
    ) -> Result<Connection, RepositoryError> {
        let connection = Connection::new(ConnectionIdFactory::generate(), identity, Timestamp::now());
        self.registry.register(connection.clone(), sender).await?;

        tracing::info!(
            "Connection '{}' accepted for user '{}' ({})",
            connection.id,
            connection.user_id(),
            connection.role()
        );
        Ok(connection)
    }
}
