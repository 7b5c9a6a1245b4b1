//! # pgvault security
//!
//! Security building blocks for tenant-scoped payment-gateway configuration:
//! - Per-request tenant and branch resolution with a task-scoped context
//! - Tenant-isolation access control with an `OPS` bypass role
//! - Versioned AES-256-GCM credential encryption with Argon2id key derivation
//!
//! # Example
//!
//! ```no_run
//! use pgvault_security::keys::{CredentialCipher, KeyRing};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ring = KeyRing::new(1, [(1, [0x42u8; 32])])?;
//! let cipher = CredentialCipher::new(Arc::new(ring));
//!
//! let stored = cipher.encrypt("test_sk_123")?;
//! assert!(stored.starts_with("v1::"));
//! assert_eq!(cipher.decrypt(&stored)?.expose(), "test_sk_123");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Error types for the security module
pub mod error;

/// Versioned credential encryption
pub mod keys;

/// Tenant-isolation access control
pub mod access;

/// Request-scoped tenant resolution
pub mod tenant;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::access::*;
    pub use crate::error::*;
    pub use crate::keys::*;
    pub use crate::tenant::*;
}
