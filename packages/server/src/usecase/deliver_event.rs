//! UseCase: hamster / toast の配信（DeliveryRouter）
//!
//! ## 責務
//!
//! - イベントの target を Registry のスナップショットに対して解決する
//! - 送信者（sender / senderId）の付与と、配信件数の集計
//!
//! Registry の状態は変更しません。配信はベストエフォートで、
//! 同じイベントを 2 回配信すれば 2 回送られます（重複排除はしない）。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - target なし / "all" / "me" / 複数指定 の配信先
//! - ライブ接続からの配信で sender が上書きされること
//! - HTTP 経由の配信で senderId が付かないこと

use std::sync::Arc;

use crate::{
    domain::{BroadcastEvent, ConnectionId, HubObserver, HubSignal, should_deliver},
    infrastructure::{dto::conversion::encode_broadcast, registry::ConnectionRegistry},
};

use super::error::DeliverError;

pub struct DeliverEventUseCase {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn HubObserver>,
}

impl DeliverEventUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>, observer: Arc<dyn HubObserver>) -> Self {
        Self { registry, observer }
    }

    /// Route an event sent by a live connection.
    ///
    /// Any sender the event claims is replaced by the connection's current
    /// display name. Returns how many connections the event was queued to; an
    /// unknown sender (already disconnected) delivers nothing.
    pub async fn deliver_from_connection(
        &self,
        sender_id: &ConnectionId,
        mut event: BroadcastEvent,
    ) -> Result<usize, DeliverError> {
        let Some(sender) = self.registry.get(sender_id).await else {
            tracing::debug!("Sender '{}' is gone, event discarded", sender_id);
            return Ok(0);
        };
        event.set_sender(sender.display_name.to_string());
        self.route(&event, Some(sender_id)).await
    }

    /// Route an event received over HTTP. The body's own sender is kept for
    /// `"me"` resolution and display.
    pub async fn deliver_from_http(
        &self,
        event: &BroadcastEvent,
        remote_address: &str,
    ) -> Result<usize, DeliverError> {
        let sent = self.route(event, None).await?;
        self.observer.observe(&HubSignal::HttpBroadcast {
            remote_address: remote_address.to_string(),
            kind: event.kind(),
            sent,
        });
        Ok(sent)
    }

    async fn route(
        &self,
        event: &BroadcastEvent,
        sender_id: Option<&ConnectionId>,
    ) -> Result<usize, DeliverError> {
        let payload = encode_broadcast(event, sender_id)?;
        let target = event.target();
        let sender = event.sender();
        let sent = self
            .registry
            .deliver(|c| should_deliver(c, target, sender), &payload)
            .await;

        self.observer.observe(&HubSignal::Delivered {
            kind: event.kind(),
            sender: sender.map(str::to_string),
            recipients: sent,
        });
        Ok(sent)
    }
}
