//! UseCase: リアクションの中継（ReactionRelay）
//!
//! リアクションは 1 つの接続にだけ届けます。`targetUserId` はセッション ID、
//! 表示名、`"<name> (<addr>)"` / `"<name>-<addr>"` のいずれかで、
//! 複数一致した場合は最も古い接続が選ばれます。見つからなければ破棄します。

use std::sync::Arc;

use shoutout_shared::time::Clock;

use crate::{
    domain::{Connection, ConnectionId, HubObserver, HubSignal, Reaction, matches_reaction_target},
    infrastructure::{dto::conversion::encode_reaction, registry::ConnectionRegistry},
};

use super::error::DeliverError;

pub struct RelayReactionUseCase {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn HubObserver>,
    clock: Arc<dyn Clock>,
}

impl RelayReactionUseCase {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        observer: Arc<dyn HubObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            observer,
            clock,
        }
    }

    /// Relay `reaction` from the live connection `from_id`.
    ///
    /// The outbound `fromUser` is the sender's current display name, whatever
    /// the frame claimed. Returns the recipient, if one was resolved.
    pub async fn execute(
        &self,
        from_id: &ConnectionId,
        reaction: &Reaction,
    ) -> Result<Option<Connection>, DeliverError> {
        let Some(from) = self.registry.get(from_id).await else {
            return Ok(None);
        };

        let payload = encode_reaction(reaction, &from, self.clock.now_millis())?;
        let target_user_id = reaction.target_user_id.as_str();
        let recipient = self
            .registry
            .deliver_first(|c| matches_reaction_target(c, target_user_id), &payload)
            .await;

        match &recipient {
            Some(to) => self.observer.observe(&HubSignal::ReactionRelayed {
                from: from.display_name.to_string(),
                to: to.display_name.to_string(),
            }),
            None => self.observer.observe(&HubSignal::ReactionUnresolved {
                target_user_id: target_user_id.to_string(),
            }),
        }
        Ok(recipient)
    }
}
