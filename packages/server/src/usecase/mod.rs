//! UseCase layer: the hub's operations, composed from domain rules and
//! infrastructure state.

mod auth_gate;
mod connect_participant;
mod deliver_event;
mod disconnect_participant;
pub mod error;
mod list_participants;
mod manage_tokens;
mod relay_reaction;
mod rename_participant;
mod token_store;

pub use auth_gate::{AuthContext, AuthGate, AuthSettings, Credentials};
pub use connect_participant::ConnectParticipantUseCase;
pub use deliver_event::DeliverEventUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{AuthError, DeliverError, ManageTokenError, TokenStoreError};
pub use list_participants::ListParticipantsUseCase;
pub use manage_tokens::{ManageTokensUseCase, Reassigned, Revoked};
pub use relay_reaction::RelayReactionUseCase;
pub use rename_participant::RenameParticipantUseCase;
pub use token_store::{TOUCH_FLUSH_INTERVAL_MS, TokenStore};
