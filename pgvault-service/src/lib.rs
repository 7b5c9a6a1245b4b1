//! # pgvault service
//!
//! Business operations over tenant payment-gateway configurations:
//! - [`configuration::PgConfigurationService`] - approval state machine with
//!   tenant isolation and per-transition history
//! - [`rotation::KeyRotationService`] - batch re-encryption under the active key
//! - [`connection::ConnectionTestDispatcher`] - bounded live credential checks
//!   against Toss Payments, Iamport, Stripe and `PayPal`
//!
//! # Example
//!
//! ```no_run
//! use pgvault_core::config::PgVaultConfig;
//! use pgvault_core::repository::InMemoryPgConfigurationStore;
//! use pgvault_security::keys::{CredentialCipher, KeyRing};
//! use pgvault_service::configuration::PgConfigurationService;
//! use pgvault_service::connection::ConnectionTestDispatcher;
//! use std::sync::Arc;
//!
//! # fn example(config: PgVaultConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let cipher = CredentialCipher::new(Arc::new(KeyRing::from_settings(&config.encryption)?));
//! let dispatcher = ConnectionTestDispatcher::from_settings(&config.connection_test)?;
//! let service = PgConfigurationService::new(
//!     Arc::new(InMemoryPgConfigurationStore::new()),
//!     cipher,
//!     Arc::new(dispatcher),
//!     config.approval.clone(),
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod configuration;
pub mod connection;
pub mod error;
pub mod rotation;

pub use error::{ConflictKind, Result, ServiceError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::configuration::*;
    pub use crate::connection::*;
    pub use crate::error::*;
    pub use crate::rotation::*;
}
