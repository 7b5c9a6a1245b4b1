//! Iamport (`PortOne` v1).

use async_trait::async_trait;
use pgvault_core::types::PgProvider;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::tester::{
    ConnectionTestResult, ConnectionTester, ProviderCredentials, preflight, transport_failure,
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

/// Requests an access token with the REST API key and secret.
pub struct IamportTester {
    client: Client,
    base_url: String,
}

impl IamportTester {
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
impl ConnectionTester for IamportTester {
    fn name(&self) -> &'static str {
        "iamport"
    }

    fn supports(&self, provider: PgProvider) -> bool {
        provider == PgProvider::Iamport
    }

    async fn test(&self, credentials: &ProviderCredentials) -> ConnectionTestResult {
        if let Some(result) = preflight(credentials) {
            return result;
        }

        let response = match self
            .client
            .post(format!("{}/users/getToken", self.base_url))
            .json(&json!({
                "imp_key": credentials.api_key.expose(),
                "imp_secret": credentials.secret_key.expose(),
            }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(PgProvider::Iamport, &e),
        };

        let status = response.status();
        let parsed = response.json::<TokenResponse>().await;
        match parsed {
            Ok(token) if status.is_success() && token.code == 0 => {
                ConnectionTestResult::success("Iamport issued an access token")
            }
            Ok(token) => ConnectionTestResult::failed(format!(
                "Iamport refused the credentials: {}",
                token.message.as_deref().unwrap_or("no message")
            ))
            .with_details(json!({ "http_status": status.as_u16(), "provider_code": token.code })),
            Err(_) => ConnectionTestResult::failed(format!("Iamport returned HTTP {status}"))
                .with_details(json!({ "http_status": status.as_u16() })),
        }
    }
}
