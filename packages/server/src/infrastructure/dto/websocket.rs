//! WebSocket frame DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{PresenceStatus, ReactionKind, Severity, Target};

/// Wire value of the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Hamster,
    Toast,
    Reaction,
    UpdateName,
    UserStatus,
}

// ========================================
// Inbound (client → hub)
// ========================================

/// Any frame a client may send. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundFrame {
    Hamster(HamsterFrame),
    Toast(ToastFrame),
    Reaction(ReactionFrame),
    UpdateName(UpdateNameFrame),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HamsterFrame {
    pub variant: Option<String>,
    pub duration: Option<u64>,
    pub target: Option<Target>,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToastFrame {
    pub message: Option<String>,
    pub severity: Option<Severity>,
    pub duration: Option<u64>,
    pub spoiler: Option<bool>,
    pub target: Option<Target>,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionFrame {
    pub target_user_id: Option<String>,
    pub reaction: Option<ReactionKind>,
    pub from_user: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNameFrame {
    pub name: Option<String>,
}

// ========================================
// Outbound (hub → client)
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HamsterMessage {
    pub r#type: MessageType,
    pub variant: String,
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToastMessage {
    pub r#type: MessageType,
    pub message: String,
    pub severity: Severity,
    pub duration: u64,
    pub spoiler: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub recipient_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionMessage {
    pub r#type: MessageType,
    pub from_user: String,
    pub from_user_id: String,
    pub reaction: ReactionKind,
    pub target_user_id: String,
    pub timestamp: String,
}

/// Participant reference inside presence notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserStatusMessage {
    pub r#type: MessageType,
    pub status: PresenceStatus,
    pub user: UserRef,
    pub message: String,
    pub timestamp: String,
}
