//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - ソケット終了時の Registry からの削除と offline 通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断と通知
//! - エッジケース：置き換え・失効で既に削除済みのセッション（何も通知しない）

use std::sync::Arc;

use crate::{
    domain::{Connection, ConnectionId, HubObserver, HubSignal},
    infrastructure::registry::ConnectionRegistry,
};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn HubObserver>,
}

impl DisconnectParticipantUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>, observer: Arc<dyn HubObserver>) -> Self {
        Self { registry, observer }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// * `Some(Connection)` - 削除された接続（残りの参加者に offline を通知済み）
    /// * `None` - 既に削除済みだった場合
    pub async fn execute(&self, id: &ConnectionId) -> Option<Connection> {
        let removed = self.registry.remove(id).await?;
        self.observer.observe(&HubSignal::Disconnected {
            id: removed.id.to_string(),
            name: removed.display_name.to_string(),
        });
        Some(removed)
    }
}
