//! In-memory store.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::state::StoreState;
use super::{PgConfigurationFilter, PgConfigurationStore, StorageResult};
use crate::types::{ConfigId, PgConfiguration, PgConfigurationHistory};

/// Process-local store, suitable for tests and single-node development.
#[derive(Debug, Default)]
pub struct InMemoryPgConfigurationStore {
    state: RwLock<StoreState>,
}

impl InMemoryPgConfigurationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of configuration rows, soft-deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().configurations.len()
    }

    /// Returns true if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of history rows.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }
}

#[async_trait]
impl PgConfigurationStore for InMemoryPgConfigurationStore {
    async fn insert(
        &self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration> {
        let stored = self.state.write().insert(config, history)?;
        debug!(config_id = %stored.config_id, "Inserted configuration");
        Ok(stored)
    }

    async fn update(
        &self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration> {
        let stored = self.state.write().update(config, history)?;
        debug!(config_id = %stored.config_id, version = stored.version, "Updated configuration");
        Ok(stored)
    }

    async fn find_by_id(&self, config_id: &ConfigId) -> StorageResult<Option<PgConfiguration>> {
        Ok(self.state.read().configurations.get(config_id).cloned())
    }

    async fn find(&self, filter: &PgConfigurationFilter) -> StorageResult<Vec<PgConfiguration>> {
        Ok(self.state.read().find(filter))
    }

    async fn history(&self, config_id: &ConfigId) -> StorageResult<Vec<PgConfigurationHistory>> {
        Ok(self.state.read().history(config_id))
    }
}
