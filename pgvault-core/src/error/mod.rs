//! Error types for configuration loading and persistence.
//!
//! Both enums are serializable so they can cross the CLI and HTTP layers
//! unchanged; higher layers fold them into their own taxonomies.

mod config;
mod storage;

pub use config::ConfigError;
pub use storage::StorageError;
