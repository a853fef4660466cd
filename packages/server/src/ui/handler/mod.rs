//! Request handlers.

mod admin;
mod http;
mod websocket;

use std::net::SocketAddr;

use serde::de::DeserializeOwned;

use crate::{
    domain::{HubSignal, ValidationError},
    infrastructure::rate_limit::KeyedRateLimiter,
    usecase::AuthError,
};

use super::{error::ApiError, state::AppState};

pub use admin::{list_tokens, reassign_owner, revoke_token};
pub use http::{
    auth_check, broadcast, get_user, health_check, invite, list_users, revoke_self,
};
pub use websocket::websocket_handler;

/// Address used for rate limiting and logging
fn remote_ip(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

/// Record an authentication failure and turn it into a 401
fn reject(state: &AppState, remote_address: &str, error: AuthError) -> ApiError {
    state.observer.observe(&HubSignal::AuthRejected {
        remote_address: remote_address.to_string(),
        reason: error.to_string(),
    });
    error.into()
}

fn admit(limiter: &KeyedRateLimiter, key: &str) -> Result<(), ApiError> {
    if limiter.admit(key) {
        Ok(())
    } else {
        tracing::debug!("Rate limit exceeded for {}", key);
        Err(ApiError::RateLimited)
    }
}

/// Parse a JSON body; an empty body parses as the type's default.
fn parse_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::Malformed(e.to_string()).into())
}
