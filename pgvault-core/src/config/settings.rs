//! Service configuration.

use super::traits::Validatable;
use super::validation::{EnvOverride, ValidationContext, Validator};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Top-level service configuration.
///
/// # Example YAML
///
/// ```yaml
/// tenant:
///   base_domains: ["core-solution.example.com"]
/// encryption:
///   active_version: 2
///   keys:
///     - version: 1
///       key_env: PGVAULT_KEY_V1
///     - version: 2
///       key_env: PGVAULT_KEY_V2
/// approval:
///   require_successful_test: false
/// storage:
///   path: /var/lib/pgvault/configurations.json
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PgVaultConfig {
    /// Tenant and branch resolution.
    #[serde(default)]
    pub tenant: TenantSettings,
    /// Credential encryption keys.
    #[serde(default)]
    pub encryption: EncryptionSettings,
    /// Outbound provider checks.
    #[serde(default)]
    pub connection_test: ConnectionTestSettings,
    /// Approval policy.
    #[serde(default)]
    pub approval: ApprovalSettings,
    /// Persistence.
    #[serde(default)]
    pub storage: StorageSettings,
    /// HTTP server.
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validatable for PgVaultConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.section("tenant", |ctx| self.tenant.validate_with_context(ctx));
        ctx.section("encryption", |ctx| self.encryption.validate_with_context(ctx));
        ctx.section("connection_test", |ctx| {
            self.connection_test.validate_with_context(ctx);
        });
        ctx.section("approval", |ctx| self.approval.validate_with_context(ctx));
        ctx.section("server", |ctx| self.server.validate_with_context(ctx));
        ctx.into_result()
    }
}

impl PgVaultConfig {
    /// Applies `PGVAULT_*` environment variable overrides.
    ///
    /// - `PGVAULT_SERVER_PORT=9090` overrides `server.port`
    /// - `PGVAULT_ENCRYPTION_ACTIVE_VERSION=3` overrides `encryption.active_version`
    /// - `PGVAULT_TENANT_BASE_DOMAINS=a.com,b.com` overrides `tenant.base_domains`
    pub fn apply_env_overrides(&mut self) {
        self.tenant.apply_env_overrides("PGVAULT_TENANT");
        EnvOverride::apply_number(
            "PGVAULT_ENCRYPTION_ACTIVE_VERSION",
            &mut self.encryption.active_version,
        );
        EnvOverride::apply_number(
            "PGVAULT_CONNECTION_TEST_TIMEOUT_MS",
            &mut self.connection_test.timeout_ms,
        );
        EnvOverride::apply_bool(
            "PGVAULT_APPROVAL_TEST_CONNECTION_BY_DEFAULT",
            &mut self.approval.test_connection_by_default,
        );
        EnvOverride::apply_bool(
            "PGVAULT_APPROVAL_REQUIRE_SUCCESSFUL_TEST",
            &mut self.approval.require_successful_test,
        );
        EnvOverride::apply_optional_string("PGVAULT_STORAGE_PATH", &mut self.storage.path);
        EnvOverride::apply_string("PGVAULT_SERVER_HOST", &mut self.server.host);
        EnvOverride::apply_number("PGVAULT_SERVER_PORT", &mut self.server.port);
        EnvOverride::apply_string("PGVAULT_LOGGING_LEVEL", &mut self.logging.level);
        EnvOverride::apply_string("PGVAULT_LOGGING_FORMAT", &mut self.logging.format);
    }
}

/// Tenant and branch resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSettings {
    /// Header carrying an explicit tenant id.
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
    /// Header carrying an explicit branch id.
    #[serde(default = "default_branch_header")]
    pub branch_header: String,
    /// Base-domain suffixes whose first label names a tenant.
    #[serde(default)]
    pub base_domains: Vec<String>,
    /// Subdomains that never name a tenant.
    #[serde(default = "default_reserved_subdomains")]
    pub reserved_subdomains: Vec<String>,
    /// Session attribute holding the authenticated user id.
    #[serde(default = "default_session_user_key")]
    pub session_user_key: String,
    /// Session attribute caching the tenant id.
    #[serde(default = "default_session_tenant_key")]
    pub session_tenant_key: String,
    /// Session attribute caching the branch id.
    #[serde(default = "default_session_branch_key")]
    pub session_branch_key: String,
    /// Session attribute caching the branch code.
    #[serde(default = "default_session_branch_code_key")]
    pub session_branch_code_key: String,
}

fn default_tenant_header() -> String {
    "X-Tenant-Id".to_string()
}

fn default_branch_header() -> String {
    "X-Branch-Id".to_string()
}

fn default_reserved_subdomains() -> Vec<String> {
    ["www", "api", "staging", "dev", "admin", "ops", "app", "static", "mail"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_session_user_key() -> String {
    "userId".to_string()
}

fn default_session_tenant_key() -> String {
    "tenantId".to_string()
}

fn default_session_branch_key() -> String {
    "branchId".to_string()
}

fn default_session_branch_code_key() -> String {
    "branchCode".to_string()
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            tenant_header: default_tenant_header(),
            branch_header: default_branch_header(),
            base_domains: Vec::new(),
            reserved_subdomains: default_reserved_subdomains(),
            session_user_key: default_session_user_key(),
            session_tenant_key: default_session_tenant_key(),
            session_branch_key: default_session_branch_key(),
            session_branch_code_key: default_session_branch_code_key(),
        }
    }
}

impl TenantSettings {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let base_domains_ok = self
            .base_domains
            .iter()
            .all(|d| !d.trim().is_empty() && !d.starts_with('.'));
        Validator::new(ctx)
            .require_non_empty("tenant_header", &self.tenant_header)
            .require_non_empty("branch_header", &self.branch_header)
            .require_non_empty("session_tenant_key", &self.session_tenant_key)
            .custom(
                "base_domains",
                || base_domains_ok,
                "Base domains must be non-empty and must not start with '.'",
            );
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_HEADER"), &mut self.tenant_header);
        EnvOverride::apply_list(&format!("{prefix}_BASE_DOMAINS"), &mut self.base_domains);
        EnvOverride::apply_list(
            &format!("{prefix}_RESERVED_SUBDOMAINS"),
            &mut self.reserved_subdomains,
        );
    }
}

/// Credential encryption key set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionSettings {
    /// Version new ciphertext is written under.
    #[serde(default = "default_active_version")]
    pub active_version: u32,
    /// All versions that may still appear in stored ciphertext.
    #[serde(default)]
    pub keys: Vec<KeySettings>,
}

fn default_active_version() -> u32 {
    1
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            active_version: default_active_version(),
            keys: Vec::new(),
        }
    }
}

impl EncryptionSettings {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        if self.keys.is_empty() {
            ctx.add_error(ctx.missing_field("keys"));
            return;
        }

        let mut seen = HashSet::new();
        for key in &self.keys {
            if !seen.insert(key.version) {
                ctx.add_error(
                    ctx.invalid_value("keys", format!("Duplicate key version {}", key.version)),
                );
            }
            ctx.section(format!("v{}", key.version), |ctx| key.validate_with_context(ctx));
        }

        if !seen.contains(&self.active_version) {
            ctx.add_error(ctx.invalid_value(
                "active_version",
                format!("No key configured for version {}", self.active_version),
            ));
        }
    }
}

/// Source of one key version's material. Exactly one of `key`, `key_env`
/// or `passphrase_env` must be set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct KeySettings {
    /// Key version, rendered as `v<version>` in ciphertext.
    pub version: u32,
    /// Base64-encoded 32-byte key, inline.
    #[serde(default, skip_serializing)]
    pub key: Option<String>,
    /// Environment variable holding a base64-encoded 32-byte key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_env: Option<String>,
    /// Environment variable holding a passphrase for Argon2id derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_env: Option<String>,
    /// Base64-encoded salt for passphrase derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl std::fmt::Debug for KeySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySettings")
            .field("version", &self.version)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("key_env", &self.key_env)
            .field("passphrase_env", &self.passphrase_env)
            .field("salt", &self.salt.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl KeySettings {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let sources = [
            self.key.is_some(),
            self.key_env.is_some(),
            self.passphrase_env.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        if sources != 1 {
            ctx.add_error(ctx.invalid_value(
                "source",
                "Exactly one of key, key_env or passphrase_env must be set",
            ));
        }
        if self.passphrase_env.is_some() && self.salt.is_none() {
            ctx.add_error(ctx.missing_field("salt"));
        }
    }
}

/// Outbound provider connection checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestSettings {
    /// Upper bound on a single provider call.
    #[serde(default = "default_test_timeout_ms")]
    pub timeout_ms: u64,
    /// User-Agent sent to providers.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Toss Payments API base URL.
    #[serde(default = "default_toss_base_url")]
    pub toss_base_url: String,
    /// Iamport API base URL.
    #[serde(default = "default_iamport_base_url")]
    pub iamport_base_url: String,
    /// Stripe API base URL.
    #[serde(default = "default_stripe_base_url")]
    pub stripe_base_url: String,
    /// `PayPal` live API base URL.
    #[serde(default = "default_paypal_live_base_url")]
    pub paypal_live_base_url: String,
    /// `PayPal` sandbox API base URL, used for test-mode credentials.
    #[serde(default = "default_paypal_sandbox_base_url")]
    pub paypal_sandbox_base_url: String,
}

fn default_test_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!("pgvault/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_toss_base_url() -> String {
    "https://api.tosspayments.com".to_string()
}

fn default_iamport_base_url() -> String {
    "https://api.iamport.kr".to_string()
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_paypal_live_base_url() -> String {
    "https://api-m.paypal.com".to_string()
}

fn default_paypal_sandbox_base_url() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}

impl Default for ConnectionTestSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_test_timeout_ms(),
            user_agent: default_user_agent(),
            toss_base_url: default_toss_base_url(),
            iamport_base_url: default_iamport_base_url(),
            stripe_base_url: default_stripe_base_url(),
            paypal_live_base_url: default_paypal_live_base_url(),
            paypal_sandbox_base_url: default_paypal_sandbox_base_url(),
        }
    }
}

impl ConnectionTestSettings {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .in_range("timeout_ms", &self.timeout_ms, &100, &120_000)
            .valid_url("toss_base_url", Some(self.toss_base_url.as_str()))
            .valid_url("iamport_base_url", Some(self.iamport_base_url.as_str()))
            .valid_url("stripe_base_url", Some(self.stripe_base_url.as_str()))
            .valid_url("paypal_live_base_url", Some(self.paypal_live_base_url.as_str()))
            .valid_url("paypal_sandbox_base_url", Some(self.paypal_sandbox_base_url.as_str()));
    }

    /// Returns the per-call timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Approval policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalSettings {
    /// Run a connection test when the approve request does not say.
    #[serde(default = "default_true")]
    pub test_connection_by_default: bool,
    /// Refuse approval when the connection test does not succeed.
    #[serde(default)]
    pub require_successful_test: bool,
    /// Minimum length of a rejection reason.
    #[serde(default = "default_min_rejection_reason_len")]
    pub min_rejection_reason_len: usize,
}

fn default_true() -> bool {
    true
}

fn default_min_rejection_reason_len() -> usize {
    10
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            test_connection_by_default: true,
            require_successful_test: false,
            min_rejection_reason_len: default_min_rejection_reason_len(),
        }
    }
}

impl ApprovalSettings {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx).in_range(
            "min_rejection_reason_len",
            &self.min_rejection_reason_len,
            &1,
            &1000,
        );
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// JSON file backing the store; in-memory when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Sessions unused for this long are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Upper bound on cached sessions; the least recently used is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_session_idle_secs() -> u64 {
    1_800
}

fn default_max_sessions() -> usize {
    10_000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl ServerSettings {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .require_non_empty("host", &self.host)
            .in_range("port", &self.port, &1, &65535)
            .in_range("session_idle_secs", &self.session_idle_secs, &1, &86_400)
            .in_range("max_sessions", &self.max_sessions, &1, &1_000_000);
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Idle lifetime of a cached session.
    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for daily-rotated log files; stdout only when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Redact credential-shaped strings before they reach a sink.
    #[serde(default = "default_true")]
    pub mask_sensitive: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
            mask_sensitive: true,
        }
    }
}
