//! Configuration management.
//!
//! - YAML, TOML and JSON file formats
//! - Validation with path-qualified error messages
//! - `PGVAULT_*` environment variable overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use pgvault_core::config::{ConfigLoader, PgVaultConfig};
//!
//! let config: PgVaultConfig = ConfigLoader::new().load_validated("pgvault.yaml")?;
//! ```

mod loader;
mod settings;
mod traits;
pub mod validation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use settings::{
    ApprovalSettings, ConnectionTestSettings, EncryptionSettings, KeySettings, LoggingSettings,
    PgVaultConfig, ServerSettings, StorageSettings, TenantSettings,
};
pub use traits::Validatable;
pub use validation::{EnvOverride, ValidationContext, ValidationResult, Validator};
