//! Conversion logic between DTOs and domain entities.

use shoutout_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    BroadcastEvent, Connection, ConnectionId, Hamster, InboundEvent, PresenceStatus, Reaction,
    TokenRecord, Toast, ValidationError, describe_recipients,
};
use crate::infrastructure::dto::{http as http_dto, websocket as dto};

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<dto::InboundFrame> for InboundEvent {
    type Error = ValidationError;

    fn try_from(frame: dto::InboundFrame) -> Result<Self, Self::Error> {
        match frame {
            dto::InboundFrame::Hamster(f) => Ok(InboundEvent::Broadcast(BroadcastEvent::Hamster(
                Hamster::new(f.variant, f.duration, f.target, f.sender)?,
            ))),
            dto::InboundFrame::Toast(f) => Ok(InboundEvent::Broadcast(BroadcastEvent::Toast(
                Toast::new(f.message, f.severity, f.duration, f.spoiler, f.target, f.sender)?,
            ))),
            dto::InboundFrame::Reaction(f) => Ok(InboundEvent::Reaction(Reaction::new(
                f.target_user_id,
                f.reaction,
                f.from_user,
            )?)),
            dto::InboundFrame::UpdateName(f) => f
                .name
                .map(InboundEvent::UpdateName)
                .ok_or(ValidationError::Missing { field: "name" }),
        }
    }
}

/// Parse and validate a raw text frame from a live connection.
pub fn parse_inbound(text: &str) -> Result<InboundEvent, ValidationError> {
    let frame: dto::InboundFrame =
        serde_json::from_str(text).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    frame.try_into()
}

/// Parse and validate the body of `POST /broadcast`. Only hamster and toast are accepted.
pub fn parse_broadcast_body(body: &[u8]) -> Result<BroadcastEvent, ValidationError> {
    let frame: dto::InboundFrame =
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    match InboundEvent::try_from(frame)? {
        InboundEvent::Broadcast(event) => Ok(event),
        InboundEvent::Reaction(_) => Err(ValidationError::NotBroadcastable("reaction")),
        InboundEvent::UpdateName(_) => Err(ValidationError::NotBroadcastable("update-name")),
    }
}

// ========================================
// Domain → DTO
// ========================================

/// Serialize a broadcast event as it is pushed to recipients.
pub fn encode_broadcast(
    event: &BroadcastEvent,
    sender_id: Option<&ConnectionId>,
) -> Result<String, serde_json::Error> {
    let sender_id = sender_id.map(|id| id.as_str().to_string());
    match event {
        BroadcastEvent::Hamster(h) => serde_json::to_string(&dto::HamsterMessage {
            r#type: dto::MessageType::Hamster,
            variant: h.variant.clone(),
            duration: h.duration,
            target: h.target.clone(),
            sender: h.sender.clone(),
            sender_id,
        }),
        BroadcastEvent::Toast(t) => serde_json::to_string(&dto::ToastMessage {
            r#type: dto::MessageType::Toast,
            message: t.message.clone(),
            severity: t.severity,
            duration: t.duration,
            spoiler: t.spoiler,
            target: t.target.clone(),
            sender: t.sender.clone(),
            sender_id,
            recipient_info: describe_recipients(t.target.as_ref()),
        }),
    }
}

/// Serialize a reaction for its single recipient.
pub fn encode_reaction(
    reaction: &Reaction,
    from: &Connection,
    timestamp_millis: i64,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&dto::ReactionMessage {
        r#type: dto::MessageType::Reaction,
        from_user: from.display_name.as_str().to_string(),
        from_user_id: from.id.as_str().to_string(),
        reaction: reaction.reaction,
        target_user_id: reaction.target_user_id.clone(),
        timestamp: timestamp_to_rfc3339(timestamp_millis),
    })
}

/// Serialize a `user-status` presence notification about `connection`.
pub fn encode_user_status(
    connection: &Connection,
    status: PresenceStatus,
    timestamp_millis: i64,
) -> Result<String, serde_json::Error> {
    let name = connection.display_name.as_str();
    let message = match status {
        PresenceStatus::Online => format!("{name} is now online"),
        PresenceStatus::Offline => format!("{name} went offline"),
    };
    serde_json::to_string(&dto::UserStatusMessage {
        r#type: dto::MessageType::UserStatus,
        status,
        user: dto::UserRef {
            id: connection.id.as_str().to_string(),
            name: name.to_string(),
        },
        message,
        timestamp: timestamp_to_rfc3339(timestamp_millis),
    })
}

impl From<&Connection> for http_dto::UserDto {
    fn from(connection: &Connection) -> Self {
        let status = match connection.status {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        };
        Self {
            id: connection.id.as_str().to_string(),
            name: connection.display_name.as_str().to_string(),
            status: status.to_string(),
            last_seen: timestamp_to_rfc3339(connection.last_seen.value()),
            connected_at: timestamp_to_rfc3339(connection.connected_at.value()),
        }
    }
}

impl From<&TokenRecord> for http_dto::TokenSummaryDto {
    fn from(record: &TokenRecord) -> Self {
        Self {
            prefix: record.prefix(),
            created_at: timestamp_to_rfc3339(record.created_at),
            owner_id: record.owner_id.clone(),
            device_id: record.device_id.clone(),
            last_used_at: record.last_used_at.map(timestamp_to_rfc3339),
        }
    }
}
