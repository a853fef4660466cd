//! Repository trait 定義
//!
//! TokenStore が必要とする永続化のインターフェースを定義します。
//! 具体的な実装（JSON ファイル）は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{error::TokenRepositoryError, token::TokenRecord};

/// One entry as found in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredToken {
    /// Bare token string written by older hubs, without any metadata
    Legacy(String),
    Record(TokenRecord),
}

/// Token Repository trait
///
/// The full token set is always written at once; the store is small and the
/// file is the source of truth reloaded at startup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// 永続化されたトークンを全て読み込む（存在しない場合は空）
    async fn load(&self) -> Result<Vec<StoredToken>, TokenRepositoryError>;

    /// トークン一覧を丸ごと書き込む
    async fn save(&self, records: &[TokenRecord]) -> Result<(), TokenRepositoryError>;
}
