//! JSON file-backed store.
//!
//! The whole store is rewritten on every successful write: serialize to a
//! sibling temp file, then rename over the target. A write that fails to
//! persist leaves both the file and the in-memory view unchanged.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::state::StoreState;
use super::{PgConfigurationFilter, PgConfigurationStore, StorageResult};
use crate::error::StorageError;
use crate::types::{ConfigId, PgConfiguration, PgConfigurationHistory};

const FILE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    configurations: Vec<PgConfiguration>,
    #[serde(default)]
    history: Vec<PgConfigurationHistory>,
}

impl StoreFile {
    fn from_state(state: &StoreState) -> Self {
        let mut configurations: Vec<PgConfiguration> =
            state.configurations.values().cloned().collect();
        configurations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Self {
            version: FILE_FORMAT_VERSION,
            configurations,
            history: state.history.clone(),
        }
    }

    fn into_state(self) -> StoreState {
        StoreState {
            configurations: self
                .configurations
                .into_iter()
                .map(|c| (c.config_id, c))
                .collect(),
            history: self.history,
        }
    }
}

/// Store persisted to a single JSON document.
#[derive(Debug)]
pub struct FilePgConfigurationStore {
    path: PathBuf,
    state: RwLock<StoreState>,
    write_gate: Mutex<()>,
}

impl FilePgConfigurationStore {
    /// Opens the store at `path`, creating an empty one if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if fs::try_exists(&path).await.unwrap_or(false) {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| StorageError::io("read", path.display().to_string(), e.to_string()))?;
            let file: StoreFile = serde_json::from_str(&content)
                .map_err(|e| StorageError::serialization(format!("Invalid store file: {e}")))?;
            if file.version != FILE_FORMAT_VERSION {
                return Err(StorageError::serialization(format!(
                    "Unsupported store file version: {}",
                    file.version
                )));
            }
            let state = file.into_state();
            info!(
                path = %path.display(),
                configurations = state.configurations.len(),
                "Loaded configuration store"
            );
            state
        } else {
            info!(path = %path.display(), "Starting empty configuration store");
            StoreState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
            write_gate: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StoreState) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(&StoreFile::from_state(state))
            .map_err(|e| StorageError::serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::io("create_dir", parent.display().to_string(), e.to_string())
            })?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &content).await.map_err(|e| {
            StorageError::io("write", temp_path.display().to_string(), e.to_string())
        })?;
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            StorageError::io("rename", self.path.display().to_string(), e.to_string())
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, permissions).await.map_err(|e| {
                StorageError::io("chmod", self.path.display().to_string(), e.to_string())
            })?;
        }

        debug!(path = %self.path.display(), "Persisted configuration store");
        Ok(())
    }

    async fn write_with<F>(&self, apply: F) -> StorageResult<PgConfiguration>
    where
        F: FnOnce(&mut StoreState) -> StorageResult<PgConfiguration> + Send,
    {
        let _gate = self.write_gate.lock().await;
        let mut next = self.state.read().clone();
        let stored = apply(&mut next)?;
        self.persist(&next).await?;
        *self.state.write() = next;
        Ok(stored)
    }
}

#[async_trait]
impl PgConfigurationStore for FilePgConfigurationStore {
    async fn insert(
        &self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration> {
        self.write_with(move |state| state.insert(config, history))
            .await
    }

    async fn update(
        &self,
        config: PgConfiguration,
        history: PgConfigurationHistory,
    ) -> StorageResult<PgConfiguration> {
        self.write_with(move |state| state.update(config, history))
            .await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeType, PgProvider, TenantId};
    use tempfile::TempDir;

    fn row() -> PgConfiguration {
        PgConfiguration::new_pending(
            TenantId::new("acme").unwrap(),
            PgProvider::Iamport,
            "v1::a".to_string(),
            "v1::b".to_string(),
            "alice",
        )
    }

    #[tokio::test]
    async fn test_reopen_restores_rows_and_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store").join("pg.json");

        let config = row();
        let id = config.config_id;
        {
            let store = FilePgConfigurationStore::open(&path).await.unwrap();
            let history = PgConfigurationHistory::new(
                id,
                config.tenant_id.clone(),
                ChangeType::Created,
                "alice",
            );
            store.insert(config, history).await.unwrap();
        }

        let reopened = FilePgConfigurationStore::open(&path).await.unwrap();
        let loaded = reopened.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(loaded.provider, PgProvider::Iamport);
        assert_eq!(reopened.history(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_change_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pg.json");
        let store = FilePgConfigurationStore::open(&path).await.unwrap();

        let config = row();
        let stale = config.clone();
        let history = PgConfigurationHistory::new(
            config.config_id,
            config.tenant_id.clone(),
            ChangeType::Created,
            "a",
        );
        store.insert(config, history).await.unwrap();

        let history = PgConfigurationHistory::new(
            stale.config_id,
            stale.tenant_id.clone(),
            ChangeType::Created,
            "a",
        );
        assert!(store.insert(stale, history).await.is_err());

        let reopened = FilePgConfigurationStore::open(&path).await.unwrap();
        let all = reopened.find(&PgConfigurationFilter::everything()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_file_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pg.json");
        std::fs::write(&path, r#"{"version": 9}"#).unwrap();
        let err = FilePgConfigurationStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StorageError::SerializationError { .. }));
    }
}
