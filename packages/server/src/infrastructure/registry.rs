//! In-memory connection registry.
//!
//! ## 責務
//!
//! - 接続中のセッションと、その送信キュー（`PusherChannel`）を一元管理
//! - 同名セッションの置き換え、プレゼンス通知（user-status）の送信
//! - 配信対象の解決と、ノンブロッキングなファンアウト
//!
//! ## 設計ノート
//!
//! 全ての変更と配信は単一の `Mutex` の下で直列化されます。ロック中に
//! ネットワーク I/O は行わず、各接続の有界キューへ `try_send` するだけなので、
//! 遅いクライアントが他の配信を止めることはありません。
//! キューが満杯、または閉じている接続への送信は記録した上でスキップします。

use std::{collections::HashMap, sync::Arc};

use shoutout_shared::time::Clock;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{
    CLOSE_REPLACED, Connection, ConnectionId, DisplayName, OutboundFrame, PresenceStatus,
    PusherChannel, Timestamp,
};
use crate::infrastructure::dto::conversion::encode_user_status;

struct ConnectionEntry {
    connection: Connection,
    sender: PusherChannel,
}

/// Result of admitting a new connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitOutcome {
    /// Older sessions with the same display name that were closed
    pub replaced: Vec<Connection>,
    /// Number of other sessions the online notification was queued to
    pub notified: usize,
}

/// Live membership of the hub.
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<ConnectionId, ConnectionEntry>>,
    clock: Arc<dyn Clock>,
}

impl ConnectionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Register a connection.
    ///
    /// Every open connection with the same display name is closed with
    /// [`CLOSE_REPLACED`] and removed first, then the new one is inserted and
    /// announced to everyone else.
    pub async fn admit(&self, connection: Connection, sender: PusherChannel) -> AdmitOutcome {
        let mut entries = self.entries.lock().await;

        let stale: Vec<ConnectionId> = entries
            .values()
            .filter(|e| e.connection.display_name == connection.display_name)
            .map(|e| e.connection.id.clone())
            .collect();
        let mut replaced = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(entry) = entries.remove(&id) {
                close_entry(&entry, CLOSE_REPLACED, "replaced by new connection");
                replaced.push(entry.connection);
            }
        }

        let notified = match encode_user_status(
            &connection,
            PresenceStatus::Online,
            self.clock.now_millis(),
        ) {
            Ok(payload) => push_all(entries.values(), &payload),
            Err(e) => {
                tracing::error!("Failed to encode user-status: {}", e);
                0
            }
        };

        tracing::debug!(
            "Connection '{}' ({}) admitted",
            connection.id,
            connection.display_name
        );
        entries.insert(connection.id.clone(), ConnectionEntry { connection, sender });

        AdmitOutcome { replaced, notified }
    }

    /// Remove a connection after its socket closed.
    ///
    /// Returns the removed connection, or `None` if it had already been removed
    /// (replaced or force-closed); only in the former case is `offline` announced.
    pub async fn remove(&self, id: &ConnectionId) -> Option<Connection> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(id)?;
        self.announce_offline(&entries, &entry.connection);
        Some(entry.connection)
    }

    /// Change a connection's display name in place.
    ///
    /// Uniqueness against other names is deliberately not re-checked here; only
    /// admission enforces one session per name.
    pub async fn rename(&self, id: &ConnectionId, name: DisplayName) -> Option<DisplayName> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(id)?;
        Some(std::mem::replace(&mut entry.connection.display_name, name))
    }

    /// Refresh `last_seen` for a connection
    pub async fn touch(&self, id: &ConnectionId) {
        let now = Timestamp::new(self.clock.now_millis());
        if let Some(entry) = self.entries.lock().await.get_mut(id) {
            entry.connection.last_seen = now;
        }
    }

    /// Snapshot of one connection
    pub async fn get(&self, id: &ConnectionId) -> Option<Connection> {
        self.entries
            .lock()
            .await
            .get(id)
            .map(|e| e.connection.clone())
    }

    /// Snapshot of every open connection, oldest first
    pub async fn list_online(&self) -> Vec<Connection> {
        let entries = self.entries.lock().await;
        let mut connections: Vec<Connection> =
            entries.values().map(|e| e.connection.clone()).collect();
        connections.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        connections
    }

    pub async fn count(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Queue `payload` to every connection accepted by `predicate`.
    ///
    /// Best effort: a full or closed queue is skipped. Returns how many
    /// connections the payload was queued to.
    pub async fn deliver<F>(&self, predicate: F, payload: &str) -> usize
    where
        F: Fn(&Connection) -> bool,
    {
        let entries = self.entries.lock().await;
        push_all(entries.values().filter(|e| predicate(&e.connection)), payload)
    }

    /// Queue `payload` to the first connection accepted by `predicate`.
    pub async fn deliver_first<F>(&self, predicate: F, payload: &str) -> Option<Connection>
    where
        F: Fn(&Connection) -> bool,
    {
        let entries = self.entries.lock().await;
        let mut candidates: Vec<&ConnectionEntry> = entries
            .values()
            .filter(|e| predicate(&e.connection))
            .collect();
        // Oldest session wins so the choice does not depend on map order
        candidates.sort_by_key(|e| e.connection.connected_at);
        let entry = candidates.into_iter().next()?;
        push(entry, payload);
        Some(entry.connection.clone())
    }

    /// Close and remove one session, announcing it offline.
    ///
    /// `None` if it was already gone.
    pub async fn close(&self, id: &ConnectionId, code: u16, reason: &str) -> Option<Connection> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(id)?;
        close_entry(&entry, code, reason);
        self.announce_offline(&entries, &entry.connection);
        Some(entry.connection)
    }

    /// Close and remove every session that authenticated with `token`.
    ///
    /// Each closed session is announced as offline to the remaining ones.
    pub async fn close_by_token(&self, token: &str, code: u16, reason: &str) -> Vec<Connection> {
        let mut entries = self.entries.lock().await;
        let bound: Vec<ConnectionId> = entries
            .values()
            .filter(|e| e.connection.is_bound_to(token))
            .map(|e| e.connection.id.clone())
            .collect();

        let mut closed = Vec::with_capacity(bound.len());
        for id in bound {
            if let Some(entry) = entries.remove(&id) {
                close_entry(&entry, code, reason);
                self.announce_offline(&entries, &entry.connection);
                closed.push(entry.connection);
            }
        }
        closed
    }

    fn announce_offline(
        &self,
        entries: &HashMap<ConnectionId, ConnectionEntry>,
        connection: &Connection,
    ) {
        match encode_user_status(connection, PresenceStatus::Offline, self.clock.now_millis()) {
            Ok(payload) => {
                push_all(entries.values(), &payload);
            }
            Err(e) => tracing::error!("Failed to encode user-status: {}", e),
        }
    }
}

fn push(entry: &ConnectionEntry, payload: &str) -> bool {
    match entry
        .sender
        .try_send(OutboundFrame::Text(payload.to_string()))
    {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                "Outbound queue of '{}' is full, dropping frame",
                entry.connection.id
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(
                "Outbound queue of '{}' is closed, skipping",
                entry.connection.id
            );
            false
        }
    }
}

fn push_all<'a>(entries: impl Iterator<Item = &'a ConnectionEntry>, payload: &str) -> usize {
    entries.filter(|entry| push(entry, payload)).count()
}

/// Ask the socket task to close; dropping the entry's sender ends it regardless.
fn close_entry(entry: &ConnectionEntry, code: u16, reason: &str) {
    let frame = OutboundFrame::Close {
        code,
        reason: reason.to_string(),
    };
    if entry.sender.try_send(frame).is_err() {
        tracing::debug!(
            "Could not queue close frame for '{}', relying on channel drop",
            entry.connection.id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CLOSE_REVOKED, OUTBOUND_QUEUE_CAPACITY};
    use shoutout_shared::time::ManualClock;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 同名セッションの置き換え（1 名前につき 1 セッション）
    // - プレゼンス通知（online / offline）の送信先
    // - rename / touch / close_by_token / deliver の振る舞い
    //
    // 【なぜこのテストが必要か】
    // - Registry はメンバーシップの唯一の保持者であり、整合性の要
    // - 配信が遅いクライアントに引きずられないことを保証する
    // ========================================

    fn create_registry() -> ConnectionRegistry {
        ConnectionRegistry::new(Arc::new(ManualClock::new(1_000)))
    }

    fn connection(name: &str, token: Option<&str>) -> Connection {
        Connection::new(
            DisplayName::truncated(name).unwrap(),
            "127.0.0.1".to_string(),
            token.map(str::to_string),
            None,
            None,
            Timestamp::new(1_000),
        )
    }

    async fn admit(
        registry: &ConnectionRegistry,
        name: &str,
        token: Option<&str>,
    ) -> (Connection, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = connection(name, token);
        registry.admit(conn.clone(), tx).await;
        (conn, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn texts(frames: &[OutboundFrame]) -> Vec<serde_json::Value> {
        frames
            .iter()
            .filter_map(|f| match f {
                OutboundFrame::Text(t) => serde_json::from_str(t).ok(),
                OutboundFrame::Close { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_admit_same_name_replaces_existing_session() {
        // テスト項目: 同名の接続を受け入れると古い接続が閉じられ、1 つだけ残る
        // given (前提条件):
        let registry = create_registry();
        let (old, mut old_rx) = admit(&registry, "alice", None).await;

        // when (操作):
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let new = connection("alice", None);
        let outcome = registry.admit(new.clone(), tx).await;

        // then (期待する結果):
        assert_eq!(outcome.replaced.len(), 1);
        assert_eq!(outcome.replaced[0].id, old.id);
        let online = registry.list_online().await;
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].id, new.id);
        let frames = drain(&mut old_rx);
        assert!(frames.contains(&OutboundFrame::Close {
            code: CLOSE_REPLACED,
            reason: "replaced by new connection".to_string()
        }));
    }

    #[tokio::test]
    async fn test_admit_notifies_only_others() {
        // テスト項目: online 通知は新しい接続以外の全員に送られる
        // given (前提条件):
        let registry = create_registry();
        let (_alice, mut alice_rx) = admit(&registry, "alice", None).await;

        // when (操作):
        let (tx, mut bob_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let outcome = registry.admit(connection("bob", None), tx).await;

        // then (期待する結果):
        assert_eq!(outcome.notified, 1);
        let alice_msgs = texts(&drain(&mut alice_rx));
        assert_eq!(alice_msgs.len(), 1);
        assert_eq!(alice_msgs[0]["status"], "online");
        assert_eq!(alice_msgs[0]["user"]["name"], "bob");
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_remove_announces_offline_once() {
        // テスト項目: 切断時に offline が通知され、二度目の削除は何もしない
        // given (前提条件):
        let registry = create_registry();
        let (alice, _alice_rx) = admit(&registry, "alice", None).await;
        let (_bob, mut bob_rx) = admit(&registry, "bob", None).await;

        // when (操作):
        let first = registry.remove(&alice.id).await;
        let second = registry.remove(&alice.id).await;

        // then (期待する結果):
        assert!(first.is_some());
        assert!(second.is_none());
        let bob_msgs = texts(&drain(&mut bob_rx));
        assert_eq!(bob_msgs.len(), 1);
        assert_eq!(bob_msgs[0]["status"], "offline");
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_rename_does_not_enforce_uniqueness() {
        // テスト項目: rename は他の接続との名前重複をチェックしない
        // given (前提条件):
        let registry = create_registry();
        let (_alice, _a) = admit(&registry, "alice", None).await;
        let (bob, _b) = admit(&registry, "bob", None).await;

        // when (操作):
        let previous = registry
            .rename(&bob.id, DisplayName::truncated("alice").unwrap())
            .await;

        // then (期待する結果):
        assert_eq!(previous.unwrap().as_str(), "bob");
        let names: Vec<String> = registry
            .list_online()
            .await
            .iter()
            .map(|c| c.display_name.to_string())
            .collect();
        assert_eq!(names, vec!["alice".to_string(), "alice".to_string()]);
    }

    #[tokio::test]
    async fn test_touch_updates_last_seen() {
        // テスト項目: touch で last_seen が現在時刻に更新される
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(1_000));
        let registry = ConnectionRegistry::new(clock.clone());
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let alice = connection("alice", None);
        registry.admit(alice.clone(), tx).await;

        // when (操作):
        clock.advance(5_000);
        registry.touch(&alice.id).await;

        // then (期待する結果):
        let snapshot = registry.get(&alice.id).await.unwrap();
        assert_eq!(snapshot.last_seen, Timestamp::new(6_000));
        assert_eq!(snapshot.connected_at, Timestamp::new(1_000));
    }

    #[tokio::test]
    async fn test_close_by_token_closes_only_bound_sessions() {
        // テスト項目: 指定トークンで認証した接続のみが閉じられる
        // given (前提条件):
        let registry = create_registry();
        let (_a, mut a_rx) = admit(&registry, "alice", Some("tok-1")).await;
        let (_b, mut b_rx) = admit(&registry, "bob", Some("tok-2")).await;
        drain(&mut b_rx);

        // when (操作):
        let closed = registry.close_by_token("tok-1", CLOSE_REVOKED, "token revoked").await;

        // then (期待する結果):
        assert_eq!(closed.len(), 1);
        assert_eq!(registry.count().await, 1);
        assert!(drain(&mut a_rx).contains(&OutboundFrame::Close {
            code: CLOSE_REVOKED,
            reason: "token revoked".to_string()
        }));
        let bob_msgs = texts(&drain(&mut b_rx));
        assert_eq!(bob_msgs[0]["status"], "offline");
    }

    #[tokio::test]
    async fn test_deliver_skips_full_and_closed_queues() {
        // テスト項目: 満杯・切断済みのキューはスキップされ、他への配信は継続する
        // given (前提条件):
        let registry = create_registry();
        let (full_tx, _full_rx) = mpsc::channel(1);
        full_tx
            .try_send(OutboundFrame::Text("filler".to_string()))
            .unwrap();
        registry.admit(connection("slow", None), full_tx).await;
        let (closed_tx, closed_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        drop(closed_rx);
        registry.admit(connection("gone", None), closed_tx).await;
        let (_ok, mut ok_rx) = admit(&registry, "ok", None).await;

        // when (操作):
        let sent = registry.deliver(|_| true, "payload").await;

        // then (期待する結果):
        assert_eq!(sent, 1);
        assert!(drain(&mut ok_rx).contains(&OutboundFrame::Text("payload".to_string())));
    }

    #[tokio::test]
    async fn test_deliver_first_picks_single_recipient() {
        // テスト項目: deliver_first は条件に合う最初の 1 接続にのみ送る
        // given (前提条件):
        let registry = create_registry();
        let (_a, mut a_rx) = admit(&registry, "alice", None).await;
        let (bob, mut b_rx) = admit(&registry, "bob", None).await;
        drain(&mut a_rx);

        // when (操作):
        let hit = registry
            .deliver_first(|c| c.display_name.as_str() == "bob", "hi bob")
            .await;
        let miss = registry
            .deliver_first(|c| c.display_name.as_str() == "carol", "hi carol")
            .await;

        // then (期待する結果):
        assert_eq!(hit.unwrap().id, bob.id);
        assert!(miss.is_none());
        assert_eq!(drain(&mut b_rx), vec![OutboundFrame::Text("hi bob".to_string())]);
        assert!(drain(&mut a_rx).is_empty());
    }
}
