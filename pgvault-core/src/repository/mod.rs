//! Persistence for configuration rows and their history trail.
//!
//! A [`PgConfigurationStore`] writes a configuration row and its history row
//! as one unit: a write that fails its version check or the single-active
//! constraint appends nothing. History is append-only; the trait exposes no
//! way to modify or remove a history row.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::StorageSettings;
use crate::error::StorageError;
use crate::types::{
    ApprovalStatus, ConfigId, PgConfiguration, PgConfigurationHistory, PgConfigurationStatus,
    PgProvider, TenantId,
};

mod file;
mod memory;
mod state;

pub use file::FilePgConfigurationStore;
pub use memory::InMemoryPgConfigurationStore;

/// Result type for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Name reported by the single-active uniqueness check.
pub const SINGLE_ACTIVE_CONSTRAINT: &str = "uq_pg_configuration_active_tenant_provider";

/// Query filter for configuration rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgConfigurationFilter {
    /// Restrict to one tenant.
    pub tenant_id: Option<TenantId>,
    /// Restrict to one provider.
    pub provider: Option<PgProvider>,
    /// Restrict to one operational status.
    pub status: Option<PgConfigurationStatus>,
    /// Restrict to one approval status.
    pub approval_status: Option<ApprovalStatus>,
    /// Include soft-deleted rows.
    pub include_deleted: bool,
}

impl PgConfigurationFilter {
    /// Filter matching every non-deleted row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching every row, soft-deleted ones included.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            include_deleted: true,
            ..Self::default()
        }
    }

    /// Restricts to a tenant.
    #[must_use]
    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Restricts to a provider.
    #[must_use]
    pub fn provider(mut self, provider: PgProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Restricts to an operational status.
    #[must_use]
    pub fn status(mut self, status: PgConfigurationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to an approval status.
    #[must_use]
    pub fn approval_status(mut self, approval_status: ApprovalStatus) -> Self {
        self.approval_status = Some(approval_status);
        self
    }

    /// Returns true if the row passes the filter.
    #[must_use]
    pub fn matches(&self, config: &PgConfiguration) -> bool {
        (self.include_deleted || !config.deleted)
            && self.tenant_id.as_ref().is_none_or(|t| *t == config.tenant_id)
            && self.provider.is_none_or(|p| p == config.provider)
            && self.status.is_none_or(|s| s == config.status)
            && self.approval_status.is_none_or(|a| a == config.approval_status)
    }
}

/// Storage backend for configuration rows and history.
#[async_trait]
pub trait PgConfigurationStore: Send + Sync {
    /// Inserts a new row together with its `CREATED` history entry.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the id is taken; `UniqueViolation` if the row is
    /// `ACTIVE` while another `ACTIVE` row exists for the same tenant and provider.
    async fn insert(
        &self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration>;

    /// Compare-and-swap update.
    ///
    /// `config.version` must equal the stored version. On success the stored
    /// version is incremented, `history` is appended, and the stored row is
    /// returned.
    ///
    /// # Errors
    ///
    /// `NotFound`, `VersionConflict` on a stale version, or `UniqueViolation`
    /// when the write would leave two `ACTIVE` rows for one tenant and provider.
    async fn update(
        &self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration>;

    /// Loads a row by id, soft-deleted rows included.
    async fn find_by_id(&self, config_id: &ConfigId) -> StorageResult<Option<PgConfiguration>>;

    /// Lists rows matching the filter, newest first.
    async fn find(&self, filter: &PgConfigurationFilter) -> StorageResult<Vec<PgConfiguration>>;

    /// Returns the `ACTIVE`, non-deleted row for a tenant and provider, if any.
    async fn find_active(
        &self,
        tenant_id: &TenantId,
        provider: PgProvider,
    ) -> StorageResult<Option<PgConfiguration>> {
        let filter = PgConfigurationFilter::new()
            .tenant(tenant_id.clone())
            .provider(provider)
            .status(PgConfigurationStatus::Active);
        Ok(self.find(&filter).await?.into_iter().next())
    }

    /// Returns the history of a configuration, newest first.
    async fn history(&self, config_id: &ConfigId) -> StorageResult<Vec<PgConfigurationHistory>>;
}

/// Opens the store described by `settings`: file-backed when a path is
/// configured, in-memory otherwise.
pub async fn open_store(
    settings: &StorageSettings,
) -> StorageResult<Arc<dyn PgConfigurationStore>> {
    match settings.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => Ok(Arc::new(FilePgConfigurationStore::open(path).await?)),
        None => Ok(Arc::new(InMemoryPgConfigurationStore::new())),
    }
}
