//! CLI command implementations.

pub mod configuration;
pub mod keys;
pub mod serve;
pub mod settings;
