//! Access token records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of leading characters shown whenever a token is displayed.
pub const TOKEN_PREFIX_LEN: usize = 8;

/// A persisted credential and its ownership metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub token: String,
    pub created_at: i64,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<i64>,
}

impl TokenRecord {
    /// Shortened form safe to show in listings and responses
    pub fn prefix(&self) -> String {
        token_prefix(&self.token)
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        !owner_id.is_empty() && self.owner_id.as_deref() == Some(owner_id)
    }
}

pub fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LEN).collect()
}

/// Compare two secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Mint a new unguessable token value (64 hex chars from two random v4 uuids).
pub fn generate_token_value() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
