//! Backend-independent row bookkeeping shared by the in-memory and file stores.

use chrono::Utc;
use std::collections::HashMap;

use super::{PgConfigurationFilter, SINGLE_ACTIVE_CONSTRAINT, StorageResult};
use crate::error::StorageError;
use crate::types::{ConfigId, PgConfiguration, PgConfigurationHistory};

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    pub configurations: HashMap<ConfigId, PgConfiguration>,
    pub history: Vec<PgConfigurationHistory>,
}

impl StoreState {
    fn check_single_active(&self, candidate: &PgConfiguration) -> StorageResult<()> {
        if !candidate.is_active() || candidate.deleted {
            return Ok(());
        }
        let clash = self.configurations.values().find(|other| {
            other.config_id != candidate.config_id
                && !other.deleted
                && other.is_active()
                && other.tenant_id == candidate.tenant_id
                && other.provider == candidate.provider
        });
        match clash {
            Some(other) => Err(StorageError::UniqueViolation {
                constraint: SINGLE_ACTIVE_CONSTRAINT.to_string(),
                detail: format!(
                    "configuration {} is already ACTIVE for tenant '{}' and provider {}",
                    other.config_id, other.tenant_id, other.provider
                ),
            }),
            None => Ok(()),
        }
    }

    pub fn insert(
        &mut self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration> {
        if self.configurations.contains_key(&config.config_id) {
            return Err(StorageError::AlreadyExists {
                id: config.config_id.to_string(),
            });
        }
        self.check_single_active(&config)?;
        self.configurations.insert(config.config_id, config.clone());
        self.history.push(history);
        Ok(config)
    }

    pub fn update(
        &mut self,
        mut config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration> {
        let stored_version = self
            .configurations
            .get(&config.config_id)
            .map(|stored| stored.version)
            .ok_or_else(|| StorageError::not_found(config.config_id.to_string()))?;
        if stored_version != config.version {
            return Err(StorageError::version_conflict(
                config.config_id.to_string(),
                config.version,
                stored_version,
            ));
        }
        self.check_single_active(&config)?;

        config.version += 1;
        config.updated_at = Utc::now();
        self.configurations.insert(config.config_id, config.clone());
        self.history.push(history);
        Ok(config)
    }

    pub fn find(&self, filter: &PgConfigurationFilter) -> Vec<PgConfiguration> {
        let mut rows: Vec<PgConfiguration> = self
            .configurations
            .values()
            .filter(|config| filter.matches(config))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub fn history(&self, config_id: &ConfigId) -> Vec<PgConfigurationHistory> {
        // Appended in order; reversing gives newest first without relying on
        // timestamp resolution.
        self.history
            .iter()
            .rev()
            .filter(|row| row.config_id == *config_id)
            .cloned()
            .collect()
    }
}
