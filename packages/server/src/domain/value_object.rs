//! Value objects shared across the hub.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of characters kept in a display name.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Name used when a participant connects without one.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Stable identifier of one live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh random session id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant's display name.
///
/// Always non-empty and at most [`MAX_DISPLAY_NAME_CHARS`] characters. Longer
/// input is truncated rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Build a display name from raw input.
    ///
    /// Surrounding whitespace is trimmed and the result is truncated to
    /// [`MAX_DISPLAY_NAME_CHARS`]. Returns `None` when nothing is left.
    pub fn truncated(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()))
    }

    /// Display name from the `name` query parameter, defaulting to "Anonymous".
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(Self::truncated)
            .unwrap_or_else(|| Self(DEFAULT_DISPLAY_NAME.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an arbitrary identifier
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
