//! UseCase: トークンの管理（招待コード交換、失効、オーナー付け替え）
//!
//! 失効と付け替えは TokenStore への永続化が成功した後で、そのトークンで
//! 接続中のセッションを 4001 で閉じます。永続化に失敗した場合は何も閉じません。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 招待コード交換で発行したトークンの通知
//! - 失効・付け替え時に束縛されたセッションが閉じられること
//! - 自己失効ではトークン自身が有効でなければならないこと

use std::sync::Arc;

use crate::{
    domain::{CLOSE_REVOKED, HubObserver, HubSignal, TokenRecord},
    infrastructure::registry::ConnectionRegistry,
};

use super::{
    error::{AuthError, ManageTokenError},
    token_store::TokenStore,
};

const REVOKED_REASON: &str = "token revoked";
const REASSIGNED_REASON: &str = "token owner changed";

/// Outcome of a revocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revoked {
    pub prefix: String,
    /// Live sessions that were closed
    pub closed: usize,
}

/// Outcome of an owner reassignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassigned {
    pub prefix: String,
    pub owner_id: String,
    pub closed: usize,
}

pub struct ManageTokensUseCase {
    token_store: Arc<TokenStore>,
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn HubObserver>,
}

impl ManageTokensUseCase {
    pub fn new(
        token_store: Arc<TokenStore>,
        registry: Arc<ConnectionRegistry>,
        observer: Arc<dyn HubObserver>,
    ) -> Self {
        Self {
            token_store,
            registry,
            observer,
        }
    }

    /// Exchange an invite code for a new token bound to `owner_id`.
    pub async fn exchange_invite(
        &self,
        invite_code: &str,
        owner_id: &str,
        device_id: Option<&str>,
    ) -> Result<TokenRecord, ManageTokenError> {
        let record = self
            .token_store
            .exchange_invite(invite_code, owner_id, device_id)
            .await?;
        self.observer.observe(&HubSignal::TokenIssued {
            prefix: record.prefix(),
            owner_id: record.owner_id.clone().unwrap_or_default(),
        });
        Ok(record)
    }

    /// Revoke by full token or unique prefix and close its sessions.
    pub async fn revoke(&self, reference: &str) -> Result<Revoked, ManageTokenError> {
        let removed = self.token_store.revoke(reference).await?;
        let closed = self
            .registry
            .close_by_token(&removed.token, CLOSE_REVOKED, REVOKED_REASON)
            .await
            .len();

        let prefix = removed.prefix();
        self.observer.observe(&HubSignal::TokenRevoked {
            prefix: prefix.clone(),
            closed,
        });
        Ok(Revoked { prefix, closed })
    }

    /// Revoke the caller's own token. The token must still be valid.
    pub async fn revoke_self(&self, token: Option<&str>) -> Result<Revoked, ManageTokenError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;
        if !self.token_store.validate(token).await {
            return Err(AuthError::InvalidCredential.into());
        }
        self.revoke(token).await
    }

    /// Bind a token to a new owner and close the sessions opened under the old one.
    pub async fn reassign_owner(
        &self,
        reference: &str,
        owner_id: &str,
    ) -> Result<Reassigned, ManageTokenError> {
        let updated = self.token_store.reassign_owner(reference, owner_id).await?;
        let closed = self
            .registry
            .close_by_token(&updated.token, CLOSE_REVOKED, REASSIGNED_REASON)
            .await
            .len();

        let prefix = updated.prefix();
        let owner_id = updated.owner_id.unwrap_or_default();
        self.observer.observe(&HubSignal::OwnerReassigned {
            prefix: prefix.clone(),
            owner_id: owner_id.clone(),
            closed,
        });
        Ok(Reassigned {
            prefix,
            owner_id,
            closed,
        })
    }

    /// Every token record, for the admin listing
    pub async fn list(&self) -> Vec<TokenRecord> {
        self.token_store.list().await
    }
}
