//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectConnectionUseCase::execute() メソッド
//! - すべてのルームからの削除
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続の切断
//! - 異常系：存在しない接続の切断試行

use std::sync::Arc;

use crate::domain::{Connection, ConnectionId, ConnectionRegistry, RepositoryError};

/// 切断のユースケース
pub struct DisconnectConnectionUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectConnectionUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Remove the connection from all of its rooms.
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - the removed connection
    /// * `Err(RepositoryError::ConnectionNotFound)` - already removed
    pub async fn execute(&self, connection_id: &ConnectionId) -> Result<Connection, RepositoryError> {
        let connection = self.registry.unregister(connection_id).await?;
        tracing::info!(
            "Connection '{}' for user '{}' removed from all rooms",
            connection.id,
            connection.user_id()
        );
        Ok(connection)
    }

    pub async fn count_remaining_connections(&self) -> usize {
        self.registry.count_connections().await
    }
}
