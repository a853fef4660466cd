//! HTTP API endpoint handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Path, State},
};

use crate::{
    domain::ConnectionId,
    infrastructure::{
        dto::{
            conversion::parse_broadcast_body,
            http::{
                BroadcastResponse, InviteRequest, InviteResponse, OkResponse, RevokeResponse,
                UserDto, UserResponse, UsersResponse,
            },
        },
        rate_limit::rate_limit_key,
    },
    ui::{error::ApiError, state::AppState},
    usecase::Credentials,
};

use super::{admit, parse_json, reject, remote_ip};

/// Health check endpoint
pub async fn health_check() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// Lets clients verify their credentials without side effects
pub async fn auth_check(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    credentials: Credentials,
) -> Result<Json<OkResponse>, ApiError> {
    let remote = remote_ip(&addr);
    state
        .auth_gate
        .is_authorized(&credentials)
        .await
        .map_err(|e| reject(&state, &remote, e))?;
    Ok(Json(OkResponse { ok: true }))
}

/// Broadcast a hamster or toast without a live connection
pub async fn broadcast(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    credentials: Credentials,
    body: Bytes,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let remote = remote_ip(&addr);
    admit(&state.broadcast_limiter, &remote)?;
    state
        .auth_gate
        .is_authorized(&credentials)
        .await
        .map_err(|e| reject(&state, &remote, e))?;

    let event = parse_broadcast_body(&body)?;
    let sent = state
        .deliver_event_usecase
        .deliver_from_http(&event, &remote)
        .await?;

    Ok(Json(BroadcastResponse { ok: true, sent }))
}

/// Get list of online participants
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    credentials: Credentials,
) -> Result<Json<UsersResponse>, ApiError> {
    let remote = remote_ip(&addr);
    admit(
        &state.listing_limiter,
        &rate_limit_key(credentials.token.as_deref(), &remote),
    )?;
    state
        .auth_gate
        .is_authorized_read(&credentials)
        .await
        .map_err(|e| reject(&state, &remote, e))?;

    // Domain Model から DTO への変換
    let users = state
        .list_participants_usecase
        .execute()
        .await
        .iter()
        .map(UserDto::from)
        .collect();

    Ok(Json(UsersResponse { users }))
}

/// Get one participant by session id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(id): Path<String>,
    credentials: Credentials,
) -> Result<Json<UserResponse>, ApiError> {
    let remote = remote_ip(&addr);
    admit(
        &state.listing_limiter,
        &rate_limit_key(credentials.token.as_deref(), &remote),
    )?;
    state
        .auth_gate
        .is_authorized_read(&credentials)
        .await
        .map_err(|e| reject(&state, &remote, e))?;

    let connection = state
        .list_participants_usecase
        .find(&ConnectionId::from(id.as_str()))
        .await
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse {
        user: UserDto::from(&connection),
    }))
}

/// Exchange an invite code for a token bound to `ownerId`
pub async fn invite(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Json<InviteResponse>, ApiError> {
    admit(&state.invite_limiter, &remote_ip(&addr))?;
    if !state.token_store.invites_enabled() {
        return Err(ApiError::Forbidden("Invites are disabled".to_string()));
    }

    let request: InviteRequest = parse_json(&body)?;
    let owner_id = request.owner_id.unwrap_or_default();
    if owner_id.trim().is_empty() {
        return Err(ApiError::BadRequest("ownerId is required".to_string()));
    }

    let record = state
        .manage_tokens_usecase
        .exchange_invite(
            request.invite_code.as_deref().unwrap_or_default(),
            &owner_id,
            request.device_id.as_deref(),
        )
        .await?;

    Ok(Json(InviteResponse {
        token: record.token,
    }))
}

/// Revoke the presented token itself
pub async fn revoke_self(
    State(state): State<Arc<AppState>>,
    credentials: Credentials,
) -> Result<Json<RevokeResponse>, ApiError> {
    let revoked = state
        .manage_tokens_usecase
        .revoke_self(credentials.token.as_deref())
        .await?;

    Ok(Json(RevokeResponse {
        revoked: revoked.prefix,
        closed: revoked.closed,
    }))
}
