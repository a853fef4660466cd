//! JSON ファイルによる TokenRepository 実装
//!
//! トークン一覧を 1 つの JSON 配列として保存します。書き込みは一時ファイルへ
//! 出力してから rename するため、途中でクラッシュしても既存のファイルが
//! 壊れることはありません。
//!
//! 読み込み時は以下の形式を受け付けます:
//!
//! ```text
//! [{"token": "...", "createdAt": 0, ...}, ...]   現行形式
//! ["tok1", "tok2"]                                旧形式（メタデータ無し）
//! {"tokens": [...]}                               上記いずれかのラッパー
//! ```

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{StoredToken, TokenRecord, TokenRepository, TokenRepositoryError};

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(String),
    Record(TokenRecord),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenFile {
    Bare(Vec<StoredEntry>),
    Wrapped { tokens: Vec<StoredEntry> },
}

impl From<StoredEntry> for StoredToken {
    fn from(entry: StoredEntry) -> Self {
        match entry {
            StoredEntry::Legacy(token) => StoredToken::Legacy(token),
            StoredEntry::Record(record) => StoredToken::Record(record),
        }
    }
}

/// Token table stored as a JSON file on local disk.
#[derive(Debug, Clone)]
pub struct JsonFileTokenRepository {
    path: PathBuf,
}

impl JsonFileTokenRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenRepository for JsonFileTokenRepository {
    async fn load(&self) -> Result<Vec<StoredToken>, TokenRepositoryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let entries = match serde_json::from_slice::<TokenFile>(&bytes)? {
            TokenFile::Bare(entries) | TokenFile::Wrapped { tokens: entries } => entries,
        };
        Ok(entries.into_iter().map(StoredToken::from).collect())
    }

    async fn save(&self, records: &[TokenRecord]) -> Result<(), TokenRepositoryError> {
        let json = serde_json::to_vec_pretty(records)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        tracing::debug!("Persisted {} token(s) to {}", records.len(), self.path.display());
        Ok(())
    }
}
