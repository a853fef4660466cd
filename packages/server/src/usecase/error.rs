//! UseCase error types.

use thiserror::Error;

use crate::domain::TokenRepositoryError;

/// Token store errors
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Owner id is missing or blank
    #[error("ownerId is required")]
    InvalidOwner,

    /// No token matches the given token or prefix
    #[error("no token matches '{0}'")]
    NotFound(String),

    /// More than one token starts with the given prefix
    #[error("prefix '{0}' matches more than one token")]
    Ambiguous(String),

    /// No invite codes are configured
    #[error("invite exchange is disabled")]
    InviteDisabled,

    /// The presented invite code is not one of the configured ones
    #[error("invalid invite code")]
    InvalidInviteCode,

    /// Durable storage could not be written; memory was left unchanged
    #[error("failed to persist tokens: {0}")]
    Persistence(#[from] TokenRepositoryError),
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was presented
    #[error("missing credential")]
    MissingCredential,

    /// The credential does not match any known token
    #[error("invalid credential")]
    InvalidCredential,

    /// The token is valid but bound to a different owner
    #[error("token is not bound to this owner")]
    OwnerMismatch,

    /// Administrative routes are disabled because no admin token is configured
    #[error("admin access is not configured")]
    AdminDisabled,

    /// The administrative credential is missing or wrong
    #[error("admin credential rejected")]
    AdminRejected,
}

/// Token management errors
#[derive(Debug, Error)]
pub enum ManageTokenError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] TokenStoreError),
}

/// Delivery errors
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The outbound payload could not be serialized
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}
