//! UseCase: 接続中の参加者一覧

use std::sync::Arc;

use crate::{
    domain::{Connection, ConnectionId},
    infrastructure::registry::ConnectionRegistry,
};

pub struct ListParticipantsUseCase {
    registry: Arc<ConnectionRegistry>,
}

impl ListParticipantsUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Every open connection, oldest first
    pub async fn execute(&self) -> Vec<Connection> {
        self.registry.list_online().await
    }

    pub async fn find(&self, id: &ConnectionId) -> Option<Connection> {
        self.registry.get(id).await
    }
}
