//! `PayPal`.

use async_trait::async_trait;
use pgvault_core::types::PgProvider;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;

use super::tester::{
    ConnectionTestResult, ConnectionTester, ProviderCredentials, preflight, transport_failure,
};

/// Requests an OAuth2 client-credentials token. Test-mode credentials go to
/// the sandbox.
pub struct PaypalTester {
    client: Client,
    live_base_url: String,
    sandbox_base_url: String,
}

impl PaypalTester {
    /// Creates a tester with live and sandbox endpoints.
    #[must_use]
    pub fn new(
        client: Client,
        live_base_url: impl Into<String>,
        sandbox_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            live_base_url: live_base_url.into().trim_end_matches('/').to_string(),
            sandbox_base_url: sandbox_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn base_url(&self, test_mode: bool) -> &str {
        if test_mode {
            &self.sandbox_base_url
        } else {
            &self.live_base_url
        }
    }
}

#[async_trait]
impl ConnectionTester for PaypalTester {
    fn name(&self) -> &'static str {
        "paypal"
    }

    fn supports(&self, provider: PgProvider) -> bool {
        provider == PgProvider::Paypal
    }

    async fn test(&self, credentials: &ProviderCredentials) -> ConnectionTestResult {
        if let Some(result) = preflight(credentials) {
            return result;
        }

        let url = format!("{}/v1/oauth2/token", self.base_url(credentials.test_mode));
        let response = match self
            .client
            .post(url)
            .basic_auth(credentials.api_key.expose(), Some(credentials.secret_key.expose()))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(PgProvider::Paypal, &e),
        };

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let details = json!({
            "http_status": status.as_u16(),
            "environment": if credentials.test_mode { "sandbox" } else { "live" },
        });
        if status.is_success() && body.get("access_token").is_some() {
            return ConnectionTestResult::success("PayPal issued an access token")
                .with_details(details);
        }
        let reason = body
            .get("error_description")
            .or_else(|| body.get("error"))
            .and_then(|v| v.as_str())
            .map_or_else(|| format!("HTTP {status}"), str::to_owned);
        ConnectionTestResult::failed(format!("PayPal refused the credentials: {reason}"))
            .with_details(details)
    }
}
