//! Infrastructure layer: concrete implementations of the domain interfaces,
//! wire DTOs and the in-memory membership state.

pub mod dto;
pub mod observer;
pub mod rate_limit;
pub mod registry;
pub mod repository;
