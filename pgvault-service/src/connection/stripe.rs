//! Stripe.

use async_trait::async_trait;
use pgvault_core::types::PgProvider;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::tester::{
    ConnectionTestResult, ConnectionTester, ProviderCredentials, preflight, transport_failure,
};

/// Reads the account balance with the secret key.
pub struct StripeTester {
    client: Client,
    base_url: String,
}

impl StripeTester {
    /// Creates a tester against `base_url`.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ConnectionTester for StripeTester {
    fn name(&self) -> &'static str {
        "stripe"
    }

    fn supports(&self, provider: PgProvider) -> bool {
        provider == PgProvider::Stripe
    }

    async fn test(&self, credentials: &ProviderCredentials) -> ConnectionTestResult {
        if let Some(result) = preflight(credentials) {
            return result;
        }

        let response = match self
            .client
            .get(format!("{}/v1/balance", self.base_url))
            .bearer_auth(credentials.secret_key.expose())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(PgProvider::Stripe, &e),
        };

        let status = response.status();
        let details = json!({
            "http_status": status.as_u16(),
            "livemode_expected": !credentials.test_mode,
        });
        let result = match status {
            s if s.is_success() => ConnectionTestResult::success("Stripe accepted the secret key"),
            StatusCode::UNAUTHORIZED => {
                ConnectionTestResult::failed("Stripe rejected the secret key")
            }
            StatusCode::FORBIDDEN => {
                ConnectionTestResult::failed("Stripe key lacks permission to read the balance")
            }
            s => ConnectionTestResult::failed(format!("Stripe returned HTTP {s}")),
        };
        result.with_details(details)
    }
}
