//! Token persistence implementations.

pub mod json_file;

pub use json_file::JsonFileTokenRepository;
