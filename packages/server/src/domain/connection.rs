//! Connection entity: one live session held by the registry.

use serde::Serialize;
use tokio::sync::mpsc;

use super::value_object::{ConnectionId, DisplayName, Timestamp};

/// Close code sent to a session that was superseded by a newer one with the same name.
pub const CLOSE_REPLACED: u16 = 4000;

/// Close code sent to sessions whose token was revoked or reassigned.
pub const CLOSE_REVOKED: u16 = 4001;

/// Capacity of each connection's outbound queue. Frames beyond it are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// A frame queued for a single connection's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Sending half of a connection's outbound queue.
pub type PusherChannel = mpsc::Sender<OutboundFrame>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// A live participant session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub display_name: DisplayName,
    /// Peer address as seen by the listener; never exposed through the HTTP listing.
    pub remote_address: String,
    pub status: PresenceStatus,
    /// Credential the session authenticated with (absent in no-auth mode)
    pub token: Option<String>,
    pub owner_id: Option<String>,
    pub device_id: Option<String>,
    pub connected_at: Timestamp,
    pub last_seen: Timestamp,
}

impl Connection {
    pub fn new(
        display_name: DisplayName,
        remote_address: String,
        token: Option<String>,
        owner_id: Option<String>,
        device_id: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            display_name,
            remote_address,
            status: PresenceStatus::Online,
            token,
            owner_id,
            device_id,
            connected_at: now,
            last_seen: now,
        }
    }

    /// `"<displayName> (<remoteAddress>)"`, the label clients show in pickers
    pub fn composite_label(&self) -> String {
        format!("{} ({})", self.display_name, self.remote_address)
    }

    /// `"<displayName>-<remoteAddress>"`, the legacy per-device alias
    pub fn dashed_alias(&self) -> String {
        format!("{}-{}", self.display_name, self.remote_address)
    }

    pub fn is_bound_to(&self, token: &str) -> bool {
        self.token.as_deref() == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(name: &str, token: Option<&str>) -> Connection {
        Connection::new(
            DisplayName::truncated(name).unwrap(),
            "::ffff:10.0.0.7".to_string(),
            token.map(str::to_string),
            None,
            None,
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn test_new_connection_is_online() {
        // テスト項目: 新しい接続は online で、connected_at と last_seen が一致する
        // given (前提条件):

        // when (操作):
        let conn = connection("alice", None);

        // then (期待する結果):
        assert_eq!(conn.status, PresenceStatus::Online);
        assert_eq!(conn.connected_at, conn.last_seen);
    }

    #[test]
    fn test_aliases() {
        // テスト項目: 複合ラベルとダッシュ形式のエイリアスが生成される
        // given (前提条件):
        let conn = connection("alice", None);

        // when (操作):
        let composite = conn.composite_label();
        let dashed = conn.dashed_alias();

        // then (期待する結果):
        assert_eq!(composite, "alice (::ffff:10.0.0.7)");
        assert_eq!(dashed, "alice-::ffff:10.0.0.7");
    }

    #[test]
    fn test_is_bound_to() {
        // テスト項目: 接続は認証に使ったトークンにのみ紐づく
        // given (前提条件):
        let bound = connection("alice", Some("tok-a"));
        let anonymous = connection("bob", None);

        // when (操作):

        // then (期待する結果):
        assert!(bound.is_bound_to("tok-a"));
        assert!(!bound.is_bound_to("tok-b"));
        assert!(!anonymous.is_bound_to("tok-a"));
    }
}
