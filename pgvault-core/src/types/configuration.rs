//! The persisted configuration row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    ApprovalStatus, ConfigId, ConnectionTestOutcome, PgConfigurationStatus, PgProvider, TenantId,
};

/// Provider-dependent routing metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    /// Merchant identifier issued by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,
    /// Store identifier issued by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Endpoint the provider posts payment events to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Redirect after a successful payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    /// Redirect after a cancelled payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

/// Last persisted connection-test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTestSummary {
    /// When the test finished.
    pub tested_at: DateTime<Utc>,
    /// Outcome of the test.
    pub outcome: ConnectionTestOutcome,
    /// Human-readable message.
    pub message: String,
    /// Provider-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A tenant's payment-gateway registration.
///
/// Credentials are held only as versioned ciphertext (`v<N>::<payload>`).
/// `version` is the optimistic-concurrency token; repositories bump it on
/// every successful write and refuse writes that carry a stale value.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PgConfiguration {
    /// Immutable identifier.
    pub config_id: ConfigId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Provider the credentials belong to.
    pub provider: PgProvider,
    /// Optional label shown to operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the credentials target the provider sandbox.
    pub test_mode: bool,
    /// Encrypted API key.
    pub api_key_encrypted: String,
    /// Encrypted secret key.
    pub secret_key_encrypted: String,
    /// Provider routing metadata.
    #[serde(default)]
    pub routing: RoutingMetadata,
    /// Operational status.
    pub status: PgConfigurationStatus,
    /// Approval status.
    pub approval_status: ApprovalStatus,
    /// Reason recorded on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Who requested the registration.
    pub requested_by: String,
    /// When the registration was requested.
    pub requested_at: DateTime<Utc>,
    /// Who approved or rejected it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// When it was approved or rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Last connection-test result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connection_test: Option<ConnectionTestSummary>,
    /// Free-form provider settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    /// Notes attached by the requester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// When the row was soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: u64,
}

impl PgConfiguration {
    /// Creates a new registration in `PENDING`/`PENDING`.
    #[must_use]
    pub fn new_pending(
        tenant_id: TenantId,
        provider: PgProvider,
        api_key_encrypted: String,
        secret_key_encrypted: String,
        requested_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            config_id: ConfigId::new(),
            tenant_id,
            provider,
            display_name: None,
            test_mode: false,
            api_key_encrypted,
            secret_key_encrypted,
            routing: RoutingMetadata::default(),
            status: PgConfigurationStatus::Pending,
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
            requested_by: requested_by.into(),
            requested_at: now,
            approved_by: None,
            approved_at: None,
            last_connection_test: None,
            settings: None,
            notes: None,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Returns true if the row is operationally live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PgConfigurationStatus::Active
    }

    /// Returns true if the row may carry payment traffic.
    #[must_use]
    pub fn is_usable_for_payments(&self) -> bool {
        !self.deleted && self.is_active() && self.approval_status == ApprovalStatus::Approved
    }

    /// Returns true while awaiting an operator decision.
    #[must_use]
    pub fn is_awaiting_approval(&self) -> bool {
        self.approval_status == ApprovalStatus::Pending
    }

    /// Activation guard: approval must be `APPROVED` first.
    #[must_use]
    pub fn can_activate(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved && !self.is_active()
    }

    /// Deactivation guard.
    #[must_use]
    pub fn can_deactivate(&self) -> bool {
        self.is_active()
    }
}

impl fmt::Debug for PgConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConfiguration")
            .field("config_id", &self.config_id)
            .field("tenant_id", &self.tenant_id)
            .field("provider", &self.provider)
            .field("test_mode", &self.test_mode)
            .field("api_key_encrypted", &"[REDACTED]")
            .field("secret_key_encrypted", &"[REDACTED]")
            .field("status", &self.status)
            .field("approval_status", &self.approval_status)
            .field("deleted", &self.deleted)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
