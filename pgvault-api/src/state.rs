//! Application state for the API server.

use pgvault_core::config::PgVaultConfig;
use pgvault_core::repository::open_store;
use pgvault_security::keys::{CredentialCipher, KeyRing};
use pgvault_security::tenant::TenantResolver;
use pgvault_service::ServiceError;
use pgvault_service::configuration::PgConfigurationService;
use pgvault_service::connection::ConnectionTestDispatcher;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::session::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration lifecycle operations
    pub service: Arc<PgConfigurationService>,
    /// Per-request tenant resolution
    pub resolver: Arc<TenantResolver>,
    /// Session attribute cache
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Creates state around an existing service.
    #[must_use]
    pub fn new(service: Arc<PgConfigurationService>, resolver: TenantResolver) -> Self {
        Self {
            service,
            resolver: Arc::new(resolver),
            sessions: Arc::new(SessionStore::new()),
        }
    }

    /// Wires store, key ring, testers and resolver from configuration.
    pub async fn from_config(config: &PgVaultConfig) -> Result<Self, ApiError> {
        let store = open_store(&config.storage)
            .await
            .map_err(ServiceError::from)?;
        let keys = KeyRing::from_settings(&config.encryption).map_err(ServiceError::from)?;
        info!(
            active_key_version = keys.active_version(),
            loaded_versions = ?keys.versions(),
            "Credential key ring loaded"
        );
        let dispatcher = ConnectionTestDispatcher::from_settings(&config.connection_test)?;

        let service = PgConfigurationService::new(
            store,
            CredentialCipher::new(Arc::new(keys)),
            Arc::new(dispatcher),
            config.approval.clone(),
        );

        let mut state = Self::new(
            Arc::new(service),
            TenantResolver::new(config.tenant.clone()),
        );
        state.sessions = Arc::new(SessionStore::from_settings(&config.server));
        Ok(state)
    }
}
