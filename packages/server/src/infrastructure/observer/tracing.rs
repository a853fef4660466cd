//! Renders hub signals as `tracing` events.

use crate::domain::{HubObserver, HubSignal};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HubObserver for TracingObserver {
    fn observe(&self, signal: &HubSignal) {
        match signal {
            HubSignal::Connected {
                id,
                name,
                remote_address,
            } => tracing::info!(%id, %name, %remote_address, "participant connected"),
            HubSignal::Replaced { id, name } => {
                tracing::info!(%id, %name, "session replaced by a newer connection")
            }
            HubSignal::Disconnected { id, name } => {
                tracing::info!(%id, %name, "participant disconnected")
            }
            HubSignal::Renamed { id, from, to } => {
                tracing::info!(%id, %from, %to, "participant renamed")
            }
            HubSignal::Delivered {
                kind,
                sender,
                recipients,
            } => tracing::info!(
                kind,
                sender = sender.as_deref().unwrap_or("-"),
                recipients,
                "event delivered"
            ),
            HubSignal::HttpBroadcast {
                remote_address,
                kind,
                sent,
            } => tracing::info!(%remote_address, kind, sent, "broadcast via HTTP"),
            HubSignal::ReactionRelayed { from, to } => {
                tracing::info!(%from, %to, "reaction relayed")
            }
            HubSignal::ReactionUnresolved { target_user_id } => {
                tracing::warn!(%target_user_id, "reaction target not connected, dropped")
            }
            HubSignal::FrameDropped { id, reason } => {
                tracing::debug!(%id, reason = reason.as_str(), "inbound frame dropped")
            }
            HubSignal::AuthRejected {
                remote_address,
                reason,
            } => tracing::warn!(%remote_address, %reason, "authentication rejected"),
            HubSignal::TokenIssued { prefix, owner_id } => {
                tracing::info!(%prefix, %owner_id, "token issued")
            }
            HubSignal::TokenRevoked { prefix, closed } => {
                tracing::info!(%prefix, closed, "token revoked")
            }
            HubSignal::OwnerReassigned {
                prefix,
                owner_id,
                closed,
            } => tracing::info!(%prefix, %owner_id, closed, "token owner reassigned"),
        }
    }
}
