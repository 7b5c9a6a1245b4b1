//! Outbound shapes. Stored ciphertext never leaves the service boundary.

use chrono::{DateTime, Utc};
use pgvault_core::types::{
    ApprovalStatus, ConfigId, ConnectionTestSummary, PgConfiguration, PgConfigurationHistory,
    PgConfigurationStatus, PgProvider, RoutingMetadata, TenantId,
};
use pgvault_security::keys::CredentialCipher;
use pgvault_service::configuration::ConfigurationDetail;
use serde::Serialize;

/// A configuration as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationView {
    /// Identifier.
    pub config_id: ConfigId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Provider.
    pub provider: PgProvider,
    /// Provider display name.
    pub provider_name: &'static str,
    /// Label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Sandbox credentials.
    pub test_mode: bool,
    /// Routing metadata.
    #[serde(flatten)]
    pub routing: RoutingMetadata,
    /// Operational status.
    pub status: PgConfigurationStatus,
    /// Approval status.
    pub approval_status: ApprovalStatus,
    /// Rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Requester.
    pub requested_by: String,
    /// Request time.
    pub requested_at: DateTime<Utc>,
    /// Approver or rejecter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Decision time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Last connection test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connection_test: Option<ConnectionTestSummary>,
    /// Key version the credentials are sealed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_version: Option<u32>,
    /// Provider settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    /// Notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Concurrency token.
    pub version: u64,
}

impl From<PgConfiguration> for ConfigurationView {
    fn from(config: PgConfiguration) -> Self {
        Self {
            key_version: CredentialCipher::key_version_of(&config.api_key_encrypted),
            config_id: config.config_id,
            tenant_id: config.tenant_id,
            provider: config.provider,
            provider_name: config.provider.display_name(),
            display_name: config.display_name,
            test_mode: config.test_mode,
            routing: config.routing,
            status: config.status,
            approval_status: config.approval_status,
            rejection_reason: config.rejection_reason,
            requested_by: config.requested_by,
            requested_at: config.requested_at,
            approved_by: config.approved_by,
            approved_at: config.approved_at,
            last_connection_test: config.last_connection_test,
            settings: config.settings,
            notes: config.notes,
            created_at: config.created_at,
            updated_at: config.updated_at,
            version: config.version,
        }
    }
}

/// Configuration with its history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    /// The configuration.
    pub configuration: ConfigurationView,
    /// History rows.
    pub history: Vec<PgConfigurationHistory>,
}

impl From<ConfigurationDetail> for DetailView {
    fn from(detail: ConfigurationDetail) -> Self {
        Self {
            configuration: detail.configuration.into(),
            history: detail.history,
        }
    }
}

/// Converts a list of rows.
#[must_use]
pub fn views(configs: Vec<PgConfiguration>) -> Vec<ConfigurationView> {
    configs.into_iter().map(ConfigurationView::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_omits_ciphertext() {
        let config = PgConfiguration::new_pending(
            TenantId::new("acme").unwrap(),
            PgProvider::Toss,
            "v3::c2VjcmV0LWFwaS1rZXktY2lwaGVydGV4dA==".to_string(),
            "v3::c2VjcmV0LXNlY3JldC1jaXBoZXJ0ZXh0".to_string(),
            "alice",
        );
        let json = serde_json::to_string(&ConfigurationView::from(config)).unwrap();

        assert!(!json.contains("c2VjcmV0"));
        assert!(!json.contains("encrypted"));
        assert!(json.contains(r#""key_version":3"#));
        assert!(json.contains(r#""provider_name":"Toss Payments""#));
    }
}
