//! Configuration lifecycle: create, review, activate, retire.

use chrono::Utc;
use pgvault_core::config::ApprovalSettings;
use pgvault_core::repository::{PgConfigurationFilter, PgConfigurationStore};
use pgvault_core::types::{
    ApprovalStatus, ChangeType, ConfigId, PgConfiguration, PgConfigurationHistory,
    PgConfigurationStatus, PgProvider, TenantId,
};
use pgvault_security::access::AccessControl;
use pgvault_security::keys::CredentialCipher;
use pgvault_security::tenant::RequestContext;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::requests::{
    ApproveRequest, ConfigurationDetail, CreateConfigurationRequest, ListQuery, RejectRequest,
    UpdateConfigurationRequest,
};
use crate::connection::{ConnectionTestDispatcher, ConnectionTestResult, ProviderCredentials};
use crate::error::{ConflictKind, Result, ServiceError};

/// Orchestrates the configuration state machine.
///
/// Every accepted state change is one compare-and-swap write carrying exactly
/// one history row. Tenant-facing operations take the tenant from the request
/// path and check it against the resolved context; operator operations
/// require the `OPS` role.
pub struct PgConfigurationService {
    store: Arc<dyn PgConfigurationStore>,
    cipher: CredentialCipher,
    access: AccessControl,
    dispatcher: Arc<ConnectionTestDispatcher>,
    approval: ApprovalSettings,
}

impl PgConfigurationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn PgConfigurationStore>,
        cipher: CredentialCipher,
        dispatcher: Arc<ConnectionTestDispatcher>,
        approval: ApprovalSettings,
    ) -> Self {
        Self {
            store,
            cipher,
            access: AccessControl::new(),
            dispatcher,
            approval,
        }
    }

    /// Key version new credentials are encrypted under.
    #[must_use]
    pub fn active_key_version(&self) -> u32 {
        self.cipher.key_ring().active_version()
    }

    /// Lists a tenant's configurations, newest first.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        query: ListQuery,
    ) -> Result<Vec<PgConfiguration>> {
        self.access.validate_tenant_access(ctx, tenant_id)?;
        let mut filter = PgConfigurationFilter::new().tenant(tenant_id.clone());
        filter.status = query.status;
        filter.approval_status = query.approval_status;
        filter.provider = query.provider;
        Ok(self.store.find(&filter).await?)
    }

    /// Loads a configuration and its history.
    pub async fn get_detail(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        config_id: &ConfigId,
    ) -> Result<ConfigurationDetail> {
        let configuration = self.load_owned(ctx, tenant_id, config_id).await?;
        let history = self.store.history(config_id).await?;
        Ok(ConfigurationDetail {
            configuration,
            history,
        })
    }

    /// Registers a configuration as `PENDING`/`PENDING`.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        request: CreateConfigurationRequest,
    ) -> Result<PgConfiguration> {
        self.access.validate_tenant_access(ctx, tenant_id)?;
        request.validate()?;

        if let Some(active) = self.store.find_active(tenant_id, request.provider).await? {
            return Err(ServiceError::conflict(
                ConflictKind::AlreadyActive,
                format!(
                    "an ACTIVE {} configuration ({}) already exists for tenant '{tenant_id}'; \
                     deactivate it first",
                    request.provider, active.config_id
                ),
            ));
        }

        let api_key = self.cipher.encrypt(request.api_key.trim())?;
        let secret_key = self.cipher.encrypt(request.secret_key.trim())?;

        let mut config = PgConfiguration::new_pending(
            tenant_id.clone(),
            request.provider,
            api_key,
            secret_key,
            ctx.actor(),
        );
        config.display_name = Some(
            request
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| request.provider.display_name().to_string()),
        );
        config.test_mode = request.test_mode;
        config.routing = request.routing;
        config.settings = request.settings;
        config.notes = request.notes;

        let history = PgConfigurationHistory::new(
            config.config_id,
            tenant_id.clone(),
            ChangeType::Created,
            ctx.actor(),
        )
        .with_status(PgConfigurationStatus::Pending, PgConfigurationStatus::Pending)
        .with_approval(ApprovalStatus::Pending, ApprovalStatus::Pending)
        .with_notes("Configuration registered; awaiting approval");

        let config = self.store.insert(config, history).await?;
        info!(
            config_id = %config.config_id,
            tenant_id = %tenant_id,
            provider = %config.provider,
            actor = ctx.actor(),
            "PG configuration created"
        );
        Ok(config)
    }

    /// Edits a configuration and sends it back for approval.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        config_id: &ConfigId,
        request: UpdateConfigurationRequest,
    ) -> Result<PgConfiguration> {
        let current = self.load_owned(ctx, tenant_id, config_id).await?;
        if current.is_active() {
            return Err(ServiceError::invalid_transition(format!(
                "configuration {config_id} is ACTIVE; deactivate it before editing"
            )));
        }
        request.validate()?;

        let mut next = current.clone();
        let api_key_changed =
            self.replace_key(&mut next.api_key_encrypted, request.api_key.as_deref())?;
        let secret_key_changed =
            self.replace_key(&mut next.secret_key_encrypted, request.secret_key.as_deref())?;

        if let Some(name) = request.display_name {
            next.display_name = Some(name);
        }
        if let Some(test_mode) = request.test_mode {
            next.test_mode = test_mode;
        }
        if let Some(routing) = request.routing {
            next.routing = routing;
        }
        if request.settings.is_some() {
            next.settings = request.settings;
        }
        if request.notes.is_some() {
            next.notes = request.notes;
        }
        next.status = PgConfigurationStatus::Pending;
        next.approval_status = ApprovalStatus::Pending;
        next.rejection_reason = None;
        next.approved_by = None;
        next.approved_at = None;
        next.requested_by = ctx.actor().to_string();
        next.requested_at = Utc::now();

        let mut notes = String::from("Configuration updated; re-approval required");
        if api_key_changed {
            notes.push_str(" (API key changed)");
        }
        if secret_key_changed {
            notes.push_str(" (secret key changed)");
        }
        let history = PgConfigurationHistory::new(
            *config_id,
            tenant_id.clone(),
            ChangeType::Updated,
            ctx.actor(),
        )
            .with_status(current.status, next.status)
            .with_approval(current.approval_status, next.approval_status)
            .with_notes(notes);

        let updated = self.store.update(next, history).await?;
        info!(
            config_id = %config_id,
            tenant_id = %tenant_id,
            api_key_changed,
            secret_key_changed,
            "PG configuration updated"
        );
        Ok(updated)
    }

    /// Soft-deletes a configuration. An `ACTIVE` row is deactivated in the
    /// same write.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        config_id: &ConfigId,
    ) -> Result<()> {
        let current = self.load_owned(ctx, tenant_id, config_id).await?;

        let mut next = current.clone();
        next.deleted = true;
        next.deleted_at = Some(Utc::now());
        if next.is_active() {
            next.status = PgConfigurationStatus::Inactive;
        }
        let history = PgConfigurationHistory::new(
            *config_id,
            tenant_id.clone(),
            ChangeType::Deleted,
            ctx.actor(),
        )
            .with_status(current.status, next.status)
            .with_notes("Configuration deleted");

        self.store.update(next, history).await?;
        info!(config_id = %config_id, tenant_id = %tenant_id, "PG configuration deleted");
        Ok(())
    }

    /// Runs and records a connection test for a tenant-owned configuration.
    pub async fn test_connection(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        config_id: &ConfigId,
    ) -> Result<ConnectionTestResult> {
        let config = self.load_owned(ctx, tenant_id, config_id).await?;
        let result = self.run_connection_test(&config).await?;
        self.record_connection_test(ctx, config, &result).await;
        Ok(result)
    }

    /// Operator variant of [`test_connection`](Self::test_connection) that
    /// needs no tenant path.
    pub async fn ops_test_connection(
        &self,
        ctx: &RequestContext,
        config_id: &ConfigId,
    ) -> Result<ConnectionTestResult> {
        self.access.require_ops(ctx, "test connection")?;
        let config = self.load_live(config_id).await?;
        let result = self.run_connection_test(&config).await?;
        self.record_connection_test(ctx, config, &result).await;
        Ok(result)
    }

    /// Approval queue across tenants. Operators only.
    pub async fn list_pending_approvals(
        &self,
        ctx: &RequestContext,
        tenant_id: Option<&TenantId>,
        provider: Option<PgProvider>,
    ) -> Result<Vec<PgConfiguration>> {
        self.access.require_ops(ctx, "list pending approvals")?;
        let mut filter = PgConfigurationFilter::new().approval_status(ApprovalStatus::Pending);
        filter.tenant_id = tenant_id.cloned();
        filter.provider = provider;
        Ok(self.store.find(&filter).await?)
    }

    /// Operator history view.
    pub async fn ops_detail(
        &self,
        ctx: &RequestContext,
        config_id: &ConfigId,
    ) -> Result<ConfigurationDetail> {
        self.access.require_ops(ctx, "view configuration history")?;
        let configuration = self.load_live(config_id).await?;
        let history = self.store.history(config_id).await?;
        Ok(ConfigurationDetail {
            configuration,
            history,
        })
    }

    /// Approves a `PENDING` configuration.
    ///
    /// When a connection test runs, its result is stored on the row in the
    /// same write as the approval. A failing test blocks approval only when
    /// `require_successful_test` is set; the failed result is then recorded
    /// on its own.
    pub async fn approve(
        &self,
        ctx: &RequestContext,
        config_id: &ConfigId,
        request: ApproveRequest,
    ) -> Result<PgConfiguration> {
        self.access.require_ops(ctx, "approve")?;
        let approver = require_actor(ctx, "approved_by")?;
        let current = self.load_live(config_id).await?;
        if current.approval_status != ApprovalStatus::Pending {
            return Err(ServiceError::invalid_transition(format!(
                "configuration {config_id} is {}; only PENDING configurations can be approved",
                current.approval_status
            )));
        }

        let should_test = request
            .test_connection
            .unwrap_or(self.approval.test_connection_by_default);
        let test_result = if should_test {
            let result = match self.run_connection_test(&current).await {
                Ok(result) => result,
                Err(ServiceError::UnsupportedProvider { provider }) => {
                    ConnectionTestResult::failed(format!(
                        "No connection tester available for {}",
                        provider.display_name()
                    ))
                }
                Err(e) => return Err(e),
            };
            if !result.success {
                warn!(
                    config_id = %config_id,
                    outcome = %result.outcome,
                    message = %result.message,
                    "Connection test before approval did not succeed"
                );
                if self.approval.require_successful_test {
                    self.record_connection_test(ctx, current, &result).await;
                    return Err(ServiceError::invalid_transition(format!(
                        "connection test {}: {}; approval requires a successful test",
                        result.outcome, result.message
                    )));
                }
            }
            Some(result)
        } else {
            None
        };

        let mut next = current.clone();
        next.approval_status = ApprovalStatus::Approved;
        next.approved_by = Some(approver.clone());
        next.approved_at = Some(Utc::now());
        next.rejection_reason = None;

        let mut history = PgConfigurationHistory::new(
            *config_id,
            current.tenant_id.clone(),
            ChangeType::Approved,
            approver,
        )
            .with_approval(current.approval_status, next.approval_status)
            .with_notes(request.note.unwrap_or_else(|| "Approved".to_string()));
        if let Some(result) = &test_result {
            next.last_connection_test = Some(result.to_summary());
            history = history.with_details(json!({
                "connection_test": {
                    "outcome": result.outcome,
                    "message": result.message,
                    "duration_ms": result.duration_ms,
                }
            }));
        }

        let approved = self.store.update(next, history).await?;
        info!(
            config_id = %config_id,
            tenant_id = %approved.tenant_id,
            tested = test_result.is_some(),
            "PG configuration approved"
        );
        Ok(approved)
    }

    /// Rejects a `PENDING` configuration with a reason.
    pub async fn reject(
        &self,
        ctx: &RequestContext,
        config_id: &ConfigId,
        request: RejectRequest,
    ) -> Result<PgConfiguration> {
        self.access.require_ops(ctx, "reject")?;
        let rejecter = require_actor(ctx, "rejected_by")?;
        request.validate(self.approval.min_rejection_reason_len)?;
        let current = self.load_live(config_id).await?;
        if current.approval_status != ApprovalStatus::Pending {
            return Err(ServiceError::invalid_transition(format!(
                "configuration {config_id} is {}; only PENDING configurations can be rejected",
                current.approval_status
            )));
        }

        let reason = request.reason.trim().to_string();
        let mut next = current.clone();
        next.approval_status = ApprovalStatus::Rejected;
        next.status = PgConfigurationStatus::Rejected;
        next.rejection_reason = Some(reason.clone());

        let history = PgConfigurationHistory::new(
            *config_id,
            current.tenant_id.clone(),
            ChangeType::Rejected,
            rejecter,
        )
            .with_status(current.status, next.status)
            .with_approval(current.approval_status, next.approval_status)
            .with_notes(reason);

        let rejected = self.store.update(next, history).await?;
        info!(config_id = %config_id, tenant_id = %rejected.tenant_id, "PG configuration rejected");
        Ok(rejected)
    }

    /// Puts an `APPROVED` configuration into service. Operators only.
    pub async fn activate(
        &self,
        ctx: &RequestContext,
        config_id: &ConfigId,
    ) -> Result<PgConfiguration> {
        self.access.require_ops(ctx, "activate")?;
        let current = self.load_live(config_id).await?;
        if current.is_active() {
            return Err(ServiceError::invalid_transition(format!(
                "configuration {config_id} is already ACTIVE"
            )));
        }
        if !current.can_activate() {
            return Err(ServiceError::invalid_transition(format!(
                "configuration {config_id} is {}; only APPROVED configurations can be activated",
                current.approval_status
            )));
        }

        let mut next = current.clone();
        next.status = PgConfigurationStatus::Active;
        let history = PgConfigurationHistory::new(
            *config_id,
            current.tenant_id.clone(),
            ChangeType::Activated,
            ctx.actor(),
        )
            .with_status(current.status, next.status)
            .with_notes("Configuration activated");

        let activated = self.store.update(next, history).await?;
        info!(
            config_id = %config_id,
            tenant_id = %activated.tenant_id,
            provider = %activated.provider,
            "PG configuration activated"
        );
        Ok(activated)
    }

    /// Takes an `ACTIVE` configuration out of service. Operators only.
    pub async fn deactivate(
        &self,
        ctx: &RequestContext,
        config_id: &ConfigId,
    ) -> Result<PgConfiguration> {
        self.access.require_ops(ctx, "deactivate")?;
        let current = self.load_live(config_id).await?;
        if !current.can_deactivate() {
            return Err(ServiceError::invalid_transition(format!(
                "configuration {config_id} is {}; only ACTIVE configurations can be deactivated",
                current.status
            )));
        }

        let mut next = current.clone();
        next.status = PgConfigurationStatus::Inactive;
        let history = PgConfigurationHistory::new(
            *config_id,
            current.tenant_id.clone(),
            ChangeType::Deactivated,
            ctx.actor(),
        )
            .with_status(current.status, next.status)
            .with_notes("Configuration deactivated");

        let deactivated = self.store.update(next, history).await?;
        info!(
            config_id = %config_id,
            tenant_id = %deactivated.tenant_id,
            "PG configuration deactivated"
        );
        Ok(deactivated)
    }

    /// Configurations usable for payments: `ACTIVE` and `APPROVED`.
    pub async fn active_configurations(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
    ) -> Result<Vec<PgConfiguration>> {
        self.access.validate_tenant_access(ctx, tenant_id)?;
        let filter = PgConfigurationFilter::new()
            .tenant(tenant_id.clone())
            .status(PgConfigurationStatus::Active)
            .approval_status(ApprovalStatus::Approved);
        Ok(self.store.find(&filter).await?)
    }

    /// The configuration carrying payments for a provider, if any.
    pub async fn active_configuration(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        provider: PgProvider,
    ) -> Result<Option<PgConfiguration>> {
        self.access.validate_tenant_access(ctx, tenant_id)?;
        Ok(self
            .store
            .find_active(tenant_id, provider)
            .await?
            .filter(PgConfiguration::is_usable_for_payments))
    }

    /// Decrypted credentials of the active configuration for the payment flow.
    pub async fn payment_credentials(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        provider: PgProvider,
    ) -> Result<ProviderCredentials> {
        let config = self
            .active_configuration(ctx, tenant_id, provider)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("Active {provider} configuration"),
                id: tenant_id.to_string(),
            })?;
        debug!(
            config_id = %config.config_id,
            provider = %provider,
            "Releasing payment credentials"
        );
        self.decrypt_credentials(&config)
    }

    fn decrypt_credentials(&self, config: &PgConfiguration) -> Result<ProviderCredentials> {
        Ok(ProviderCredentials {
            provider: config.provider,
            api_key: self.cipher.decrypt(&config.api_key_encrypted)?,
            secret_key: self.cipher.decrypt(&config.secret_key_encrypted)?,
            test_mode: config.test_mode,
            merchant_id: config.routing.merchant_id.clone(),
            store_id: config.routing.store_id.clone(),
        })
    }

    /// Replaces a stored key when a new plaintext is given, otherwise moves it
    /// to the active key version. Returns whether the plaintext changed.
    fn replace_key(&self, stored: &mut String, replacement: Option<&str>) -> Result<bool> {
        match replacement {
            Some(plain) => {
                let plain = plain.trim();
                let changed = !self.cipher.decrypt(stored).is_ok_and(|old| old.expose() == plain);
                *stored = self.cipher.encrypt(plain)?;
                Ok(changed)
            }
            None => {
                *stored = self.cipher.ensure_active_key(stored)?;
                Ok(false)
            }
        }
    }

    async fn run_connection_test(&self, config: &PgConfiguration) -> Result<ConnectionTestResult> {
        if !self.dispatcher.supports(config.provider) {
            return Err(ServiceError::UnsupportedProvider {
                provider: config.provider,
            });
        }
        match self.decrypt_credentials(config) {
            Ok(credentials) => self.dispatcher.test(&credentials).await,
            Err(e) => {
                warn!(
                    config_id = %config.config_id,
                    error = %e,
                    "Stored credentials could not be decrypted"
                );
                Ok(ConnectionTestResult::failed(format!(
                    "Stored credentials could not be decrypted: {e}"
                )))
            }
        }
    }

    /// Stores a test result on the row. Failures are logged, never raised:
    /// the caller still receives the result.
    async fn record_connection_test(
        &self,
        ctx: &RequestContext,
        mut config: PgConfiguration,
        result: &ConnectionTestResult,
    ) {
        let config_id = config.config_id;
        config.last_connection_test = Some(result.to_summary());
        let history = PgConfigurationHistory::new(
            config_id,
            config.tenant_id.clone(),
            ChangeType::ConnectionTested,
            ctx.actor(),
        )
            .with_notes(format!("{}: {}", result.outcome, result.message))
            .with_details(json!({
                "outcome": result.outcome,
                "duration_ms": result.duration_ms,
                "details": result.details,
            }));
        if let Err(e) = self.store.update(config, history).await {
            warn!(config_id = %config_id, error = %e, "Failed to record connection test result");
        }
    }

    async fn load_live(&self, config_id: &ConfigId) -> Result<PgConfiguration> {
        self.store
            .find_by_id(config_id)
            .await?
            .filter(|config| !config.deleted)
            .ok_or_else(|| ServiceError::configuration_not_found(config_id.to_string()))
    }

    /// Loads a row addressed under `tenant_id`, refusing rows of another
    /// tenant even when the caller may access both.
    async fn load_owned(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        config_id: &ConfigId,
    ) -> Result<PgConfiguration> {
        self.access.validate_tenant_access(ctx, tenant_id)?;
        let config = self.load_live(config_id).await?;
        if config.tenant_id != *tenant_id {
            warn!(
                config_id = %config_id,
                requested_tenant = %tenant_id,
                actor = ctx.actor(),
                "Configuration addressed under a foreign tenant"
            );
            return Err(ServiceError::AccessDenied {
                reason: format!(
                    "configuration {config_id} does not belong to tenant '{tenant_id}'"
                ),
            });
        }
        self.access.validate_configuration_access(ctx, &config)?;
        Ok(config)
    }
}

fn require_actor(ctx: &RequestContext, field: &str) -> Result<String> {
    ctx.principal
        .as_ref()
        .map(|p| p.user_id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ServiceError::validation(field, "an authenticated operator is required"))
}
