//! Toss Payments.

use async_trait::async_trait;
use pgvault_core::types::PgProvider;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::tester::{
    ConnectionTestResult, ConnectionTester, ProviderCredentials, preflight, transport_failure,
};

/// Order id that never exists; a `404` proves the secret key was accepted.
const PROBE_ORDER_ID: &str = "pgvault-connection-probe";

/// Authenticates with the secret key against the payment lookup endpoint.
pub struct TossTester {
    client: Client,
    base_url: String,
}

impl TossTester {
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
impl ConnectionTester for TossTester {
    fn name(&self) -> &'static str {
        "toss"
    }

    fn supports(&self, provider: PgProvider) -> bool {
        provider == PgProvider::Toss
    }

    async fn test(&self, credentials: &ProviderCredentials) -> ConnectionTestResult {
        if let Some(result) = preflight(credentials) {
            return result;
        }

        let url = format!("{}/v1/payments/orders/{PROBE_ORDER_ID}", self.base_url);
        let response = match self
            .client
            .get(&url)
            .basic_auth(credentials.secret_key.expose(), Some(""))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(PgProvider::Toss, &e),
        };

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let code = body.get("code").and_then(|c| c.as_str()).map(str::to_owned);
        let details = json!({ "http_status": status.as_u16(), "provider_code": code });

        let result = match status {
            s if s.is_success() || s == StatusCode::NOT_FOUND => {
                ConnectionTestResult::success("Toss Payments accepted the secret key")
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let message = body
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("secret key rejected");
                ConnectionTestResult::failed(format!(
                    "Toss Payments authentication failed: {message}"
                ))
            }
            s => ConnectionTestResult::failed(format!("Toss Payments returned HTTP {s}")),
        };
        result.with_details(details)
    }
}
