//! UseCase: アクセストークンの管理
//!
//! ## 責務
//!
//! - トークンの発行（招待コード交換）、検証、失効、オーナー付け替え
//! - 最終利用時刻（lastUsedAt）の記録
//!
//! ## 永続化のルール
//!
//! - 構造的な変更（issue / revoke / reassign_owner）は、まず新しい一覧を
//!   Repository に書き込み、成功した場合のみメモリに反映する。
//!   書き込みに失敗した場合はエラーを返し、メモリ上の一覧は変わらない。
//! - touch はメモリのみ更新し、次の構造的変更時、または前回の書き込みから
//!   [`TOUCH_FLUSH_INTERVAL_MS`] 以上経過した時にまとめて書き込む。
//!   失敗した場合はログに残し、次の機会に再試行する。
//! - 旧形式（トークン文字列のみ）のレコードは読み込み時に補完して一度だけ書き戻す。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 発行、検証、オーナー束縛、prefix による解決（完全一致優先、曖昧さの検出）
//! - 永続化失敗時にメモリが変化しないこと
//! - touch の遅延書き込み
//! - 旧形式レコードのアップグレード
//!
//! ### どのような状況を想定しているか
//! - 正常系：招待コードの交換、失効、付け替え
//! - 異常系：空のオーナー、存在しない/曖昧な prefix、ディスク書き込みの失敗

use std::sync::Arc;

use shoutout_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    StoredToken, TokenRecord, TokenRepository, constant_time_eq, generate_token_value,
};

use super::error::TokenStoreError;

/// Minimum age of the last write before a touch triggers another one.
pub const TOUCH_FLUSH_INTERVAL_MS: i64 = 30_000;

struct TokenState {
    records: Vec<TokenRecord>,
    /// Whether the store has held at least one token since startup
    ever_issued: bool,
    /// lastUsedAt changes not yet written
    dirty: bool,
    last_flush: i64,
}

/// Issued access tokens, backed by a [`TokenRepository`].
pub struct TokenStore {
    repository: Arc<dyn TokenRepository>,
    clock: Arc<dyn Clock>,
    invite_codes: Vec<String>,
    state: Mutex<TokenState>,
}

impl TokenStore {
    /// Load the persisted tokens and build the store.
    ///
    /// Legacy bare-string entries are upgraded (created now, no owner) and the
    /// upgraded set is written back once.
    pub async fn load(
        repository: Arc<dyn TokenRepository>,
        clock: Arc<dyn Clock>,
        invite_codes: Vec<String>,
    ) -> Result<Self, TokenStoreError> {
        let now = clock.now_millis();
        let stored = repository.load().await?;

        let mut upgraded = 0usize;
        let mut records: Vec<TokenRecord> = Vec::with_capacity(stored.len());
        for entry in stored {
            let record = match entry {
                StoredToken::Record(record) => record,
                StoredToken::Legacy(token) => {
                    upgraded += 1;
                    TokenRecord {
                        token,
                        created_at: now,
                        owner_id: None,
                        device_id: None,
                        last_used_at: None,
                    }
                }
            };
            if record.token.is_empty() || records.iter().any(|r| r.token == record.token) {
                tracing::warn!("Skipping empty or duplicate token entry on load");
                continue;
            }
            records.push(record);
        }

        if upgraded > 0 {
            repository.save(&records).await?;
            tracing::info!("Upgraded {} legacy token(s) to the current format", upgraded);
        }
        tracing::info!("Loaded {} token(s)", records.len());

        let invite_codes = invite_codes
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(Self {
            repository,
            clock,
            invite_codes,
            state: Mutex::new(TokenState {
                ever_issued: !records.is_empty(),
                records,
                dirty: false,
                last_flush: now,
            }),
        })
    }

    /// Whether owner binding and exact token matches are enforced.
    ///
    /// True once invite codes are configured or any token has been held.
    pub async fn invite_system_active(&self) -> bool {
        !self.invite_codes.is_empty() || self.state.lock().await.ever_issued
    }

    pub fn invites_enabled(&self) -> bool {
        !self.invite_codes.is_empty()
    }

    /// Mint a token for `owner_id`.
    pub async fn issue(
        &self,
        owner_id: &str,
        device_id: Option<&str>,
    ) -> Result<TokenRecord, TokenStoreError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(TokenStoreError::InvalidOwner);
        }

        let mut state = self.state.lock().await;
        let mut token = generate_token_value();
        while state.records.iter().any(|r| r.token == token) {
            token = generate_token_value();
        }
        let record = TokenRecord {
            token,
            created_at: self.clock.now_millis(),
            owner_id: Some(owner_id.to_string()),
            device_id: device_id
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            last_used_at: None,
        };

        let mut next = state.records.clone();
        next.push(record.clone());
        self.commit(&mut state, next).await?;
        state.ever_issued = true;

        Ok(record)
    }

    /// Exchange an invite code for a fresh token.
    pub async fn exchange_invite(
        &self,
        invite_code: &str,
        owner_id: &str,
        device_id: Option<&str>,
    ) -> Result<TokenRecord, TokenStoreError> {
        if self.invite_codes.is_empty() {
            return Err(TokenStoreError::InviteDisabled);
        }
        // Compare against every code so timing does not reveal which one matched
        let matched = self
            .invite_codes
            .iter()
            .fold(false, |acc, code| constant_time_eq(code, invite_code) | acc);
        if !matched {
            return Err(TokenStoreError::InvalidInviteCode);
        }
        self.issue(owner_id, device_id).await
    }

    /// Whether `token` exactly matches a stored token.
    pub async fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        self.state
            .lock()
            .await
            .records
            .iter()
            .any(|r| r.token == token)
    }

    /// Whether `token` belongs to `owner_id`. Always true while no invite system is active.
    pub async fn is_owner_bound(&self, token: &str, owner_id: &str) -> bool {
        if !self.invite_system_active().await {
            return true;
        }
        self.state
            .lock()
            .await
            .records
            .iter()
            .any(|r| r.token == token && r.is_owned_by(owner_id))
    }

    /// Remove the token identified by `reference` (full token or unique prefix).
    pub async fn revoke(&self, reference: &str) -> Result<TokenRecord, TokenStoreError> {
        let mut state = self.state.lock().await;
        let index = resolve(&state.records, reference)?;

        let mut next = state.records.clone();
        let removed = next.remove(index);
        self.commit(&mut state, next).await?;

        Ok(removed)
    }

    /// Bind the token identified by `reference` to `owner_id`.
    pub async fn reassign_owner(
        &self,
        reference: &str,
        owner_id: &str,
    ) -> Result<TokenRecord, TokenStoreError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(TokenStoreError::InvalidOwner);
        }

        let mut state = self.state.lock().await;
        let index = resolve(&state.records, reference)?;

        let mut next = state.records.clone();
        next[index].owner_id = Some(owner_id.to_string());
        let updated = next[index].clone();
        self.commit(&mut state, next).await?;

        Ok(updated)
    }

    /// Record a successful use of `token`. Unknown tokens are ignored.
    pub async fn touch_last_used(&self, token: &str) {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;
        let Some(record) = state.records.iter_mut().find(|r| r.token == token) else {
            return;
        };
        record.last_used_at = Some(now);
        state.dirty = true;

        if now - state.last_flush >= TOUCH_FLUSH_INTERVAL_MS {
            match self.repository.save(&state.records).await {
                Ok(()) => {
                    state.dirty = false;
                    state.last_flush = now;
                }
                Err(e) => tracing::warn!("Failed to flush token usage, will retry: {}", e),
            }
        }
    }

    /// Write pending lastUsedAt changes, if any. Called on shutdown.
    pub async fn flush_pending(&self) -> Result<(), TokenStoreError> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(());
        }
        self.repository.save(&state.records).await?;
        state.dirty = false;
        state.last_flush = self.clock.now_millis();
        Ok(())
    }

    /// Snapshot of every record, oldest first
    pub async fn list(&self) -> Vec<TokenRecord> {
        let mut records = self.state.lock().await.records.clone();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Persist `next` (which also carries any pending touches), then make it current.
    async fn commit(
        &self,
        state: &mut TokenState,
        next: Vec<TokenRecord>,
    ) -> Result<(), TokenStoreError> {
        self.repository.save(&next).await?;
        state.records = next;
        state.dirty = false;
        state.last_flush = self.clock.now_millis();
        Ok(())
    }
}

/// Find the record `reference` points at: exact match first, then a unique prefix.
fn resolve(records: &[TokenRecord], reference: &str) -> Result<usize, TokenStoreError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(TokenStoreError::NotFound(String::new()));
    }
    if let Some(index) = records.iter().position(|r| r.token == reference) {
        return Ok(index);
    }

    let mut matches = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.token.starts_with(reference))
        .map(|(i, _)| i);
    match (matches.next(), matches.next()) {
        (Some(index), None) => Ok(index),
        (Some(_), Some(_)) => Err(TokenStoreError::Ambiguous(reference.to_string())),
        (None, _) => Err(TokenStoreError::NotFound(reference.to_string())),
    }
}
