//! UI layer: the HTTP and WebSocket boundary of the hub.

mod credentials;
pub mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{BODY_LIMIT_BYTES, Server, build_router, serve};
