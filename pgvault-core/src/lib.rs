//! # pgvault core
//!
//! Core types and persistence interfaces for tenant-scoped payment-gateway
//! configuration.
//!
//! This crate provides:
//! - `NewType` identifiers for tenants, branches and configurations
//! - The configuration row with its two independent lifecycle axes
//! - The append-only history trail
//! - Store traits with compare-and-swap writes, plus in-memory and JSON-file backends
//! - Error types and configuration loading

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Configuration management
pub mod config;

/// Error types and handling
pub mod error;

/// Configuration and history persistence
pub mod repository;

/// Domain types
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::repository::*;
    pub use crate::types::*;
}
