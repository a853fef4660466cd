//! UseCase: 表示名の変更（`update-name`）

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, DisplayName, HubObserver, HubSignal},
    infrastructure::registry::ConnectionRegistry,
};

pub struct RenameParticipantUseCase {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn HubObserver>,
}

impl RenameParticipantUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>, observer: Arc<dyn HubObserver>) -> Self {
        Self { registry, observer }
    }

    /// Apply a new display name to a live connection.
    ///
    /// The name is trimmed and truncated; a blank name is ignored. Returns the
    /// name now in effect, or `None` if nothing changed.
    pub async fn execute(&self, id: &ConnectionId, raw_name: &str) -> Option<DisplayName> {
        let name = DisplayName::truncated(raw_name)?;
        let previous = self.registry.rename(id, name.clone()).await?;
        self.observer.observe(&HubSignal::Renamed {
            id: id.to_string(),
            from: previous.to_string(),
            to: name.to_string(),
        });
        Some(name)
    }
}
