//! Domain types for tenant payment-gateway configuration.
//!
//! # Types
//!
//! - [`TenantId`], [`BranchId`] - tenant and branch identifiers
//! - [`ConfigId`] - immutable configuration identifier
//! - [`PgProvider`] - supported payment-gateway providers
//! - [`PgConfigurationStatus`] / [`ApprovalStatus`] - the two independent lifecycle axes
//! - [`PgConfiguration`] - the persisted configuration row
//! - [`PgConfigurationHistory`] / [`ChangeType`] - the append-only change trail

mod configuration;
mod history;
mod ids;
mod provider;
mod status;

pub use configuration::{ConnectionTestSummary, PgConfiguration, RoutingMetadata};
pub use history::{ChangeType, PgConfigurationHistory};
pub use ids::{BranchId, ConfigId, TenantId};
pub use provider::PgProvider;
pub use status::{ApprovalStatus, ConnectionTestOutcome, PgConfigurationStatus};

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Identifier is empty or blank.
    #[error("{0} cannot be empty")]
    EmptyIdentifier(&'static str),

    /// Identifier contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid {kind} format: {value}")]
    InvalidIdentifier {
        /// Kind of identifier.
        kind: &'static str,
        /// Rejected value.
        value: String,
    },

    /// Identifier is not a UUID.
    #[error("invalid configuration id: {0}")]
    InvalidConfigId(String),

    /// Provider name is not recognised.
    #[error("unknown payment-gateway provider: {0}")]
    UnknownProvider(String),

    /// Status name is not recognised.
    #[error("unknown {kind}: {value}")]
    UnknownStatus {
        /// Which status axis.
        kind: &'static str,
        /// Rejected value.
        value: String,
    },
}
