//! Shared application state and its assembly from [`HubConfig`].

use std::sync::Arc;

use shoutout_shared::time::Clock;

use crate::{
    config::HubConfig,
    domain::HubObserver,
    infrastructure::{
        observer::{BroadcastLogObserver, CompositeObserver, TracingObserver},
        rate_limit::{KeyedRateLimiter, RateLimitPolicy},
        registry::ConnectionRegistry,
        repository::JsonFileTokenRepository,
    },
    usecase::{
        AuthGate, ConnectParticipantUseCase, DeliverEventUseCase, DisconnectParticipantUseCase,
        ListParticipantsUseCase, ManageTokensUseCase, RelayReactionUseCase,
        RenameParticipantUseCase, TokenStore, TokenStoreError,
    },
};

/// Shared application state
pub struct AppState {
    /// AuthGate（接続・リクエストの認証）
    pub auth_gate: Arc<AuthGate>,
    /// TokenStore（シャットダウン時の flush 用）
    pub token_store: Arc<TokenStore>,
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub rename_participant_usecase: Arc<RenameParticipantUseCase>,
    pub deliver_event_usecase: Arc<DeliverEventUseCase>,
    pub relay_reaction_usecase: Arc<RelayReactionUseCase>,
    pub list_participants_usecase: Arc<ListParticipantsUseCase>,
    pub manage_tokens_usecase: Arc<ManageTokensUseCase>,
    /// `POST /broadcast`
    pub broadcast_limiter: KeyedRateLimiter,
    /// `POST /invite`
    pub invite_limiter: KeyedRateLimiter,
    /// `GET /users`, `GET /users/{id}`
    pub listing_limiter: KeyedRateLimiter,
    pub observer: Arc<dyn HubObserver>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every component together.
    ///
    /// Dependencies are created in order:
    /// 1. Repository and TokenStore (loads `tokens_file`)
    /// 2. Observer
    /// 3. Registry
    /// 4. UseCases
    pub async fn from_config(
        config: &HubConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenStoreError> {
        // 1. TokenStore
        let repository = Arc::new(JsonFileTokenRepository::new(&config.tokens_file));
        let token_store = Arc::new(
            TokenStore::load(repository, clock.clone(), config.invite_codes.clone()).await?,
        );
        if token_store.invites_enabled() {
            tracing::info!("Invite exchange enabled");
        }

        // 2. Observer
        let mut composite = CompositeObserver::new().with(Arc::new(TracingObserver));
        if let Some(path) = &config.broadcast_log {
            tracing::info!("Logging HTTP broadcasts to {}", path.display());
            composite = composite.with(Arc::new(BroadcastLogObserver::new(path, clock.clone())));
        }
        let observer: Arc<dyn HubObserver> = Arc::new(composite);

        // 3. Registry
        let registry = Arc::new(ConnectionRegistry::new(clock.clone()));

        // 4. UseCases
        let auth_gate = Arc::new(AuthGate::new(token_store.clone(), config.auth_settings()));

        Ok(Self {
            auth_gate: auth_gate.clone(),
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                registry.clone(),
                auth_gate.clone(),
                observer.clone(),
                clock.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                registry.clone(),
                observer.clone(),
            )),
            rename_participant_usecase: Arc::new(RenameParticipantUseCase::new(
                registry.clone(),
                observer.clone(),
            )),
            deliver_event_usecase: Arc::new(DeliverEventUseCase::new(
                registry.clone(),
                observer.clone(),
            )),
            relay_reaction_usecase: Arc::new(RelayReactionUseCase::new(
                registry.clone(),
                observer.clone(),
                clock.clone(),
            )),
            list_participants_usecase: Arc::new(ListParticipantsUseCase::new(registry.clone())),
            manage_tokens_usecase: Arc::new(ManageTokensUseCase::new(
                token_store.clone(),
                registry,
                observer.clone(),
            )),
            token_store,
            broadcast_limiter: KeyedRateLimiter::new(RateLimitPolicy::BROADCAST, clock.clone()),
            invite_limiter: KeyedRateLimiter::new(RateLimitPolicy::BROADCAST, clock.clone()),
            listing_limiter: KeyedRateLimiter::new(RateLimitPolicy::LISTING, clock.clone()),
            observer,
            clock,
        })
    }
}
