//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 認証済みの接続を Registry に登録し、同名セッションを置き換える処理
//!
//! ### なぜこのテストが必要か
//! - 1 つの表示名につき 1 セッションという不変条件を保証
//! - 既存の参加者に online 通知が届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加者の接続
//! - エッジケース：同じ表示名での再接続（古いセッションは 4000 で閉じられる）
//! - エッジケース：認可からアップグレード後の登録までの間にトークンが失効した場合
//!   （登録直後の再確認で 4001 で閉じられる）

use std::sync::Arc;

use shoutout_shared::time::Clock;

use crate::{
    domain::{
        CLOSE_REVOKED, Connection, ConnectionId, DisplayName, HubObserver, HubSignal,
        PusherChannel, Timestamp,
    },
    infrastructure::registry::ConnectionRegistry,
};

use super::auth_gate::{AuthContext, AuthGate};

const REVOKED_DURING_ADMISSION: &str = "token revoked";

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Registry（接続中セッションの管理）
    registry: Arc<ConnectionRegistry>,
    /// AuthGate（登録直後の再確認）
    auth_gate: Arc<AuthGate>,
    /// Observer（ハブのイベント通知）
    observer: Arc<dyn HubObserver>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        auth_gate: Arc<AuthGate>,
        observer: Arc<dyn HubObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            auth_gate,
            observer,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// 登録後に資格情報を再確認します。失効・付け替えは TokenStore への反映後に
    /// Registry を走査するため、登録前に反映されたものはここで、登録後のものは
    /// 失効側の `close_by_token` で必ず捕捉されます。
    ///
    /// # Arguments
    ///
    /// * `display_name` - 接続時に指定された表示名（Domain Model）
    /// * `remote_address` - 接続元アドレス
    /// * `auth` - AuthGate が認可した資格情報
    /// * `sender` - クライアントへの送信キュー
    ///
    /// # Returns
    ///
    /// 登録された Connection（Domain Model）。再確認に失敗した場合、
    /// 既に 4001 で閉じられています。
    pub async fn execute(
        &self,
        display_name: DisplayName,
        remote_address: String,
        auth: AuthContext,
        sender: PusherChannel,
    ) -> Connection {
        let auth_snapshot = auth.clone();
        let connection = Connection::new(
            display_name,
            remote_address,
            auth.token,
            auth.owner_id,
            auth.device_id,
            Timestamp::new(self.clock.now_millis()),
        );

        let outcome = self.registry.admit(connection.clone(), sender).await;
        for replaced in &outcome.replaced {
            self.observer.observe(&HubSignal::Replaced {
                id: replaced.id.to_string(),
                name: replaced.display_name.to_string(),
            });
        }
        self.observer.observe(&HubSignal::Connected {
            id: connection.id.to_string(),
            name: connection.display_name.to_string(),
            remote_address: connection.remote_address.clone(),
        });

        if !self.auth_gate.is_still_authorized(&auth_snapshot).await
            && self
                .registry
                .close(&connection.id, CLOSE_REVOKED, REVOKED_DURING_ADMISSION)
                .await
                .is_some()
        {
            self.observer.observe(&HubSignal::AuthRejected {
                remote_address: connection.remote_address.clone(),
                reason: "credential revoked during admission".to_string(),
            });
        }

        connection
    }

    /// 最終アクティビティ時刻（lastSeen）を更新
    pub async fn touch(&self, id: &ConnectionId) {
        self.registry.touch(id).await;
    }
}
