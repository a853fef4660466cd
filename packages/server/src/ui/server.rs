//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};
use shoutout_shared::time::{Clock, SystemClock};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::HubConfig;

use super::{
    handler::{
        auth_check, broadcast, get_user, health_check, invite, list_tokens, list_users,
        reassign_owner, revoke_self, revoke_token, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Maximum accepted request body
pub const BODY_LIMIT_BYTES: usize = 256 * 1024;

/// Build the hub router (shared between production startup and tests).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/health", get(health_check))
        .route("/auth-check", get(auth_check))
        .route("/broadcast", post(broadcast))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/invite", post(invite))
        .route("/revoke-self", delete(revoke_self))
        // 管理者エンドポイント
        .route("/tokens", get(list_tokens))
        .route("/revoke/{token}", delete(revoke_token))
        .route("/reassign-owner/{token}", patch(reassign_owner))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `state` on an already bound listener until `shutdown` resolves.
///
/// Pending token usage is flushed once the server has stopped.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state.clone());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    if let Err(e) = state.token_store.flush_pending().await {
        tracing::warn!("Failed to flush token usage on shutdown: {}", e);
    }
    Ok(())
}

/// Broadcast hub server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(HubConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    config: HubConfig,
    clock: Arc<dyn Clock>,
}

impl Server {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Run the hub until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the token file cannot be loaded, the address cannot
    /// be bound, or the server fails while running.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let state = Arc::new(AppState::from_config(&self.config, self.clock).await?);

        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Broadcast hub listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        serve(listener, state, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
