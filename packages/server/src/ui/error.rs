//! HTTP error responses.
//!
//! | error | status |
//! |---|---|
//! | authentication | 401 |
//! | invite disabled / wrong invite code | 403 |
//! | validation, ambiguous prefix, blank owner | 400 |
//! | unknown token or user | 404 |
//! | rate limited | 429 |
//! | anything else | 500 (detail only logged) |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    domain::ValidationError,
    infrastructure::dto::http::ErrorResponse,
    usecase::{AuthError, DeliverError, ManageTokenError, TokenStoreError},
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized(#[source] AuthError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests, please slow down")]
    RateLimited,

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("Request failed: {}", detail);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Unauthorized(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<TokenStoreError> for ApiError {
    fn from(e: TokenStoreError) -> Self {
        match e {
            TokenStoreError::InvalidOwner | TokenStoreError::Ambiguous(_) => {
                ApiError::BadRequest(e.to_string())
            }
            TokenStoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
            TokenStoreError::InviteDisabled | TokenStoreError::InvalidInviteCode => {
                ApiError::Forbidden(e.to_string())
            }
            TokenStoreError::Persistence(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ManageTokenError> for ApiError {
    fn from(e: ManageTokenError) -> Self {
        match e {
            ManageTokenError::Unauthorized(e) => e.into(),
            ManageTokenError::Store(e) => e.into(),
        }
    }
}

impl From<DeliverError> for ApiError {
    fn from(e: DeliverError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
