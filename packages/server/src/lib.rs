//! Real-time broadcast hub.
//!
//! Participants hold a persistent WebSocket connection and send each other
//! ephemeral notifications (hamster animations, toasts) and point-to-point
//! reactions. The hub authenticates connections against issued tokens, keeps
//! live membership, routes events to their targets and rate limits senders.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
