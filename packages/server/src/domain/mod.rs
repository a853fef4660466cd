//! Domain layer: entities, value objects and the interfaces the hub depends on.
//!
//! Nothing in here performs I/O. Persistence and observability are expressed as
//! traits ([`TokenRepository`], [`HubObserver`]) implemented by the
//! infrastructure layer.

pub mod connection;
pub mod error;
pub mod event;
pub mod observer;
pub mod repository;
pub mod targeting;
pub mod token;
pub mod value_object;

pub use connection::{
    CLOSE_REPLACED, CLOSE_REVOKED, Connection, OUTBOUND_QUEUE_CAPACITY, OutboundFrame,
    PresenceStatus, PusherChannel,
};
pub use error::{TokenRepositoryError, ValidationError};
pub use event::{
    BroadcastEvent, Hamster, InboundEvent, Reaction, ReactionKind, Severity, Target, Toast,
};
pub use observer::{DropReason, HubObserver, HubSignal, NoopObserver};
pub use repository::{StoredToken, TokenRepository};
#[cfg(test)]
pub use repository::MockTokenRepository;
pub use targeting::{describe_recipients, matches_reaction_target, should_deliver};
pub use token::{
    TOKEN_PREFIX_LEN, TokenRecord, constant_time_eq, generate_token_value, token_prefix,
};
pub use value_object::{ConnectionId, DisplayName, Timestamp};
