//! UseCase: 接続・HTTP リクエストの認証
//!
//! 認証モードは 3 つ:
//!
//! - no-auth: 運用者が明示的に有効化した場合のみ、全てを許可する
//! - 共有シークレット: 招待システムが無効な間だけ `BROADCAST_SECRET` と比較する
//! - トークン: 招待システムが有効になった後は、TokenStore の完全一致と
//!   （書き込み系では）オーナー束縛を要求する
//!
//! 管理者用の認証は `ADMIN_TOKEN` との定数時間比較で、未設定なら常に拒否する。

use std::sync::Arc;

use crate::domain::constant_time_eq;

use super::{error::AuthError, token_store::TokenStore};

/// Credentials extracted from a request by the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token, or the `token` query parameter
    pub token: Option<String>,
    /// `x-client-user`
    pub owner_id: Option<String>,
    /// `x-client-device`
    pub device_id: Option<String>,
    /// `x-admin-token`
    pub admin_token: Option<String>,
}

/// The identity an admitted request or connection carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub token: Option<String>,
    pub owner_id: Option<String>,
    pub device_id: Option<String>,
}

/// Static authentication settings.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub allow_no_auth: bool,
    /// Legacy shared secret, honored only while no invite system is active
    pub broadcast_secret: Option<String>,
    pub admin_token: Option<String>,
}

pub struct AuthGate {
    token_store: Arc<TokenStore>,
    settings: AuthSettings,
}

impl AuthGate {
    pub fn new(token_store: Arc<TokenStore>, settings: AuthSettings) -> Self {
        if settings.allow_no_auth {
            tracing::warn!("ALLOW_NO_AUTH is enabled: every request is accepted (insecure)");
        }
        Self {
            token_store,
            settings,
        }
    }

    /// Admission check performed before a WebSocket upgrade.
    pub async fn authorize_connection(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthContext, AuthError> {
        self.check(credentials, true).await
    }

    /// Gate for write routes: a valid token bound to the presented owner.
    pub async fn is_authorized(&self, credentials: &Credentials) -> Result<AuthContext, AuthError> {
        self.check(credentials, true).await
    }

    /// Gate for read routes: any valid token.
    pub async fn is_authorized_read(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthContext, AuthError> {
        self.check(credentials, false).await
    }

    /// Gate for token administration.
    ///
    /// The admin credential may come as `x-admin-token` or as the bearer token.
    pub fn is_admin_authorized(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let Some(expected) = self
            .settings
            .admin_token
            .as_deref()
            .filter(|t| !t.is_empty())
        else {
            return Err(AuthError::AdminDisabled);
        };

        let presented = credentials
            .admin_token
            .as_deref()
            .or(credentials.token.as_deref())
            .ok_or(AuthError::AdminRejected)?;
        if constant_time_eq(expected, presented) {
            Ok(())
        } else {
            Err(AuthError::AdminRejected)
        }
    }

    /// Re-check an admitted context without touching `lastUsedAt`.
    ///
    /// Used right after registry admission: a revocation or reassignment that
    /// committed between the upgrade check and admission is caught here.
    pub async fn is_still_authorized(&self, context: &AuthContext) -> bool {
        self.verify(context.token.as_deref(), context.owner_id.as_deref(), true)
            .await
            .is_ok()
    }

    async fn check(
        &self,
        credentials: &Credentials,
        require_owner: bool,
    ) -> Result<AuthContext, AuthError> {
        let context = AuthContext {
            token: credentials.token.clone(),
            owner_id: credentials.owner_id.clone(),
            device_id: credentials.device_id.clone(),
        };
        self.verify(
            context.token.as_deref(),
            context.owner_id.as_deref(),
            require_owner,
        )
        .await?;

        // 共有シークレットは TokenStore に存在しないため touch は何もしない
        if !self.settings.allow_no_auth
            && let Some(token) = context.token.as_deref()
        {
            self.token_store.touch_last_used(token).await;
        }
        Ok(context)
    }

    async fn verify(
        &self,
        token: Option<&str>,
        owner_id: Option<&str>,
        require_owner: bool,
    ) -> Result<(), AuthError> {
        if self.settings.allow_no_auth {
            return Ok(());
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        if !self.token_store.invite_system_active().await {
            return match self.settings.broadcast_secret.as_deref() {
                Some(secret) if !secret.is_empty() && constant_time_eq(secret, token) => Ok(()),
                _ => Err(AuthError::InvalidCredential),
            };
        }

        if !self.token_store.validate(token).await {
            return Err(AuthError::InvalidCredential);
        }
        if require_owner
            && !self
                .token_store
                .is_owner_bound(token, owner_id.unwrap_or_default())
                .await
        {
            return Err(AuthError::OwnerMismatch);
        }
        Ok(())
    }
}
