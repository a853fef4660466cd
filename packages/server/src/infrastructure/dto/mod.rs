//! Data Transfer Objects (DTOs) for the hub.
//!
//! DTOs are organized by protocol:
//! - `websocket`: inbound and outbound frame DTOs
//! - `http`: HTTP API request/response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
