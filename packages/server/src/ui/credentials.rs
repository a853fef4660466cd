//! Credential extraction from request headers and the query string.
//!
//! `Authorization: Bearer <t>` takes precedence over `?token=<t>`.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;

use crate::usecase::Credentials;

pub const CLIENT_USER_HEADER: &str = "x-client-user";
pub const CLIENT_DEVICE_HEADER: &str = "x-client-device";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim().to_string()).filter(|t| !t.is_empty())
}

/// Build [`Credentials`] from headers plus an optional query token.
pub fn extract_credentials(headers: &HeaderMap, query_token: Option<String>) -> Credentials {
    Credentials {
        token: bearer_token(headers).or(query_token.filter(|t| !t.is_empty())),
        owner_id: header_value(headers, CLIENT_USER_HEADER),
        device_id: header_value(headers, CLIENT_DEVICE_HEADER),
        admin_token: header_value(headers, ADMIN_TOKEN_HEADER),
    }
}

impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query_token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q.token)
            .unwrap_or_default();
        Ok(extract_credentials(&parts.headers, query_token))
    }
}
