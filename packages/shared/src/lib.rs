//! Utilities shared by the Shoutout packages: logging setup and a testable clock.

pub mod logger;
pub mod time;
