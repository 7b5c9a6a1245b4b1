//! Request and response shapes for configuration operations.

use pgvault_core::config::{ValidationContext, Validator};
use pgvault_core::types::{
    ApprovalStatus, PgConfiguration, PgConfigurationHistory, PgConfigurationStatus, PgProvider,
    RoutingMetadata,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Registers a new gateway configuration.
#[derive(Clone, Deserialize)]
pub struct CreateConfigurationRequest {
    /// Provider.
    pub provider: PgProvider,
    /// Display name; defaults to the provider's.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Plaintext API key or client id.
    pub api_key: String,
    /// Plaintext secret key or client secret.
    pub secret_key: String,
    /// Sandbox credentials.
    #[serde(default)]
    pub test_mode: bool,
    /// Merchant and callback routing.
    #[serde(default, flatten)]
    pub routing: RoutingMetadata,
    /// Free-form provider settings.
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    /// Operator notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateConfigurationRequest {
    /// Creates a request with only the required fields.
    #[must_use]
    pub fn new(
        provider: PgProvider,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            display_name: None,
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            test_mode: false,
            routing: RoutingMetadata::default(),
            settings: None,
            notes: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .require_non_empty("api_key", &self.api_key)
            .require_non_empty("secret_key", &self.secret_key);
        validate_routing(&mut ctx, &self.routing);
        Ok(ctx.into_result()?)
    }
}

impl fmt::Debug for CreateConfigurationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateConfigurationRequest")
            .field("provider", &self.provider)
            .field("display_name", &self.display_name)
            .field("api_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .field("test_mode", &self.test_mode)
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

/// Edits a configuration. Absent fields keep their stored value.
#[derive(Clone, Default, Deserialize)]
pub struct UpdateConfigurationRequest {
    /// New display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Replacement API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Replacement secret key.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// New sandbox flag.
    #[serde(default)]
    pub test_mode: Option<bool>,
    /// Replacement routing metadata.
    #[serde(default)]
    pub routing: Option<RoutingMetadata>,
    /// Replacement settings.
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    /// Replacement notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateConfigurationRequest {
    pub(crate) fn validate(&self) -> Result<()> {
        let mut ctx = ValidationContext::new();
        let mut validator = Validator::new(&mut ctx);
        if let Some(api_key) = &self.api_key {
            validator.require_non_empty("api_key", api_key);
        }
        if let Some(secret_key) = &self.secret_key {
            validator.require_non_empty("secret_key", secret_key);
        }
        if let Some(routing) = &self.routing {
            validate_routing(&mut ctx, routing);
        }
        Ok(ctx.into_result()?)
    }
}

impl fmt::Debug for UpdateConfigurationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateConfigurationRequest")
            .field("display_name", &self.display_name)
            .field("api_key_changed", &self.api_key.is_some())
            .field("secret_key_changed", &self.secret_key.is_some())
            .field("test_mode", &self.test_mode)
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

/// Operator approval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveRequest {
    /// Run a live connection test first; `None` uses the configured default.
    #[serde(default)]
    pub test_connection: Option<bool>,
    /// Note recorded in history.
    #[serde(default)]
    pub note: Option<String>,
}

/// Operator rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    /// Reason shown to the tenant.
    pub reason: String,
}

impl RejectRequest {
    /// Creates a rejection.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub(crate) fn validate(&self, min_len: usize) -> Result<()> {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .require_non_empty("reason", &self.reason)
            .custom(
                "reason",
                || self.reason.trim().chars().count() >= min_len,
                &format!("Must be at least {min_len} characters"),
            );
        Ok(ctx.into_result()?)
    }
}

/// Listing filter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Operational status.
    #[serde(default)]
    pub status: Option<PgConfigurationStatus>,
    /// Approval status.
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    /// Provider.
    #[serde(default)]
    pub provider: Option<PgProvider>,
}

/// A configuration with its audit trail, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationDetail {
    /// The configuration.
    pub configuration: PgConfiguration,
    /// History rows.
    pub history: Vec<PgConfigurationHistory>,
}

fn validate_routing(ctx: &mut ValidationContext, routing: &RoutingMetadata) {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };
    let (webhook, ret, cancel) = (
        non_blank(&routing.webhook_url),
        non_blank(&routing.return_url),
        non_blank(&routing.cancel_url),
    );
    Validator::new(ctx)
        .valid_url("webhook_url", webhook.as_deref())
        .valid_url("return_url", ret.as_deref())
        .valid_url("cancel_url", cancel.as_deref());
}
