//! Domain error types.

use thiserror::Error;

/// An inbound event failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("\"{field}\" is required")]
    Missing { field: &'static str },

    #[error("\"{field}\" must be between {min} and {max} characters long")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("\"{field}\" must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
    },

    #[error("\"{field}\" must not contain empty identifiers")]
    EmptyIdentifier { field: &'static str },

    #[error("event type \"{0}\" cannot be broadcast")]
    NotBroadcastable(&'static str),

    #[error("malformed event: {0}")]
    Malformed(String),
}

/// Failure reading or writing the persisted token table.
#[derive(Debug, Error)]
pub enum TokenRepositoryError {
    #[error("token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token storage is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}
