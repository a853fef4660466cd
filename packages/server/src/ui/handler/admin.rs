//! Token administration handlers. Every route requires the admin credential.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Path, State},
};

use crate::{
    infrastructure::dto::http::{
        ReassignOwnerRequest, ReassignOwnerResponse, RevokeResponse, TokenSummaryDto,
        TokensResponse,
    },
    ui::{error::ApiError, state::AppState},
    usecase::Credentials,
};

use super::{parse_json, reject, remote_ip};

fn require_admin(
    state: &AppState,
    addr: &SocketAddr,
    credentials: &Credentials,
) -> Result<(), ApiError> {
    state
        .auth_gate
        .is_admin_authorized(credentials)
        .map_err(|e| reject(state, &remote_ip(addr), e))
}

/// List every token by prefix
pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    credentials: Credentials,
) -> Result<Json<TokensResponse>, ApiError> {
    require_admin(&state, &addr, &credentials)?;

    let tokens = state
        .manage_tokens_usecase
        .list()
        .await
        .iter()
        .map(TokenSummaryDto::from)
        .collect();

    Ok(Json(TokensResponse { tokens }))
}

/// Revoke a token by full value or unique prefix
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(reference): Path<String>,
    credentials: Credentials,
) -> Result<Json<RevokeResponse>, ApiError> {
    require_admin(&state, &addr, &credentials)?;

    let revoked = state.manage_tokens_usecase.revoke(&reference).await?;

    Ok(Json(RevokeResponse {
        revoked: revoked.prefix,
        closed: revoked.closed,
    }))
}

/// Bind a token to a different owner
pub async fn reassign_owner(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(reference): Path<String>,
    credentials: Credentials,
    body: Bytes,
) -> Result<Json<ReassignOwnerResponse>, ApiError> {
    require_admin(&state, &addr, &credentials)?;
    let request: ReassignOwnerRequest = parse_json(&body)?;

    let reassigned = state
        .manage_tokens_usecase
        .reassign_owner(&reference, request.owner_id.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(ReassignOwnerResponse {
        reassigned: reassigned.prefix,
        owner_id: reassigned.owner_id,
        closed: reassigned.closed,
    }))
}
