//! Tester contract and result types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvault_core::types::{ConnectionTestOutcome, ConnectionTestSummary, PgProvider};
use pgvault_security::keys::Secret;
use serde::{Deserialize, Serialize};

/// Decrypted credentials handed to the payment flow and to testers.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    /// Provider the credentials belong to.
    pub provider: PgProvider,
    /// API key or client id.
    pub api_key: Secret,
    /// Secret key or client secret.
    pub secret_key: Secret,
    /// Sandbox credentials.
    pub test_mode: bool,
    /// Provider merchant id.
    pub merchant_id: Option<String>,
    /// Provider store id.
    pub store_id: Option<String>,
}

/// Outcome of one live connection check.
///
/// Provider refusals are data, not errors: they arrive here with
/// `success == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    /// True when the provider accepted the credentials.
    pub success: bool,
    /// Outcome class.
    pub outcome: ConnectionTestOutcome,
    /// Human-readable message.
    pub message: String,
    /// Provider-specific details (HTTP status, provider error code).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// When the check finished.
    pub tested_at: DateTime<Utc>,
    /// Wall-clock duration of the check.
    pub duration_ms: u64,
}

impl ConnectionTestResult {
    fn with_outcome(outcome: ConnectionTestOutcome, message: impl Into<String>) -> Self {
        Self {
            success: outcome.is_success(),
            outcome,
            message: message.into(),
            details: None,
            tested_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Provider accepted the credentials.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_outcome(ConnectionTestOutcome::Success, message)
    }

    /// Credentials missing or refused, or the call errored.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_outcome(ConnectionTestOutcome::Failed, message)
    }

    /// Provider did not answer in time.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::with_outcome(ConnectionTestOutcome::Timeout, message)
    }

    /// Attaches provider details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Form persisted on the configuration row.
    #[must_use]
    pub fn to_summary(&self) -> ConnectionTestSummary {
        ConnectionTestSummary {
            tested_at: self.tested_at,
            outcome: self.outcome,
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

/// A live credential check for one or more providers.
#[async_trait]
pub trait ConnectionTester: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this tester handles `provider`.
    fn supports(&self, provider: PgProvider) -> bool;

    /// Checks the credentials against the provider.
    ///
    /// Implementations call [`preflight`] first and never panic or return
    /// errors: every failure is a `FAILED` or `TIMEOUT` result.
    async fn test(&self, credentials: &ProviderCredentials) -> ConnectionTestResult;
}

/// Returns a `FAILED` result when either key is blank, without network I/O.
#[must_use]
pub fn preflight(credentials: &ProviderCredentials) -> Option<ConnectionTestResult> {
    let missing = match (credentials.api_key.is_blank(), credentials.secret_key.is_blank()) {
        (true, true) => "API key and secret key are missing",
        (true, false) => "API key is missing",
        (false, true) => "Secret key is missing",
        (false, false) => return None,
    };
    Some(ConnectionTestResult::failed(missing))
}

/// Maps a transport error to a result.
pub(crate) fn transport_failure(
    provider: PgProvider,
    err: &reqwest::Error,
) -> ConnectionTestResult {
    if err.is_timeout() {
        ConnectionTestResult::timeout(format!(
            "{} did not respond in time",
            provider.display_name()
        ))
    } else if err.is_connect() {
        ConnectionTestResult::failed(format!("Could not reach {}", provider.display_name()))
    } else {
        ConnectionTestResult::failed(format!("{} request failed: {err}", provider.display_name()))
    }
}

#[cfg(test)]
pub(crate) fn credentials(
    provider: PgProvider,
    api_key: &str,
    secret_key: &str,
) -> ProviderCredentials {
    ProviderCredentials {
        provider,
        api_key: Secret::new(api_key),
        secret_key: Secret::new(secret_key),
        test_mode: true,
        merchant_id: None,
        store_id: None,
    }
}
