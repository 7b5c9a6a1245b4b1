//! Provider tester registry.

use pgvault_core::config::ConnectionTestSettings;
use pgvault_core::types::PgProvider;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::iamport::IamportTester;
use super::paypal::PaypalTester;
use super::stripe::StripeTester;
use super::tester::{ConnectionTestResult, ConnectionTester, ProviderCredentials};
use super::toss::TossTester;
use crate::error::{Result, ServiceError};

/// Routes a connection test to the first registered tester that supports
/// the provider, bounded by a timeout.
pub struct ConnectionTestDispatcher {
    testers: Vec<Arc<dyn ConnectionTester>>,
    timeout: Duration,
}

impl ConnectionTestDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            testers: Vec::new(),
            timeout,
        }
    }

    /// Creates a dispatcher with the built-in Toss, Iamport, Stripe and
    /// `PayPal` testers sharing one HTTP client.
    pub fn from_settings(settings: &ConnectionTestSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| {
                ServiceError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self::new(settings.timeout())
            .with_tester(Arc::new(TossTester::new(client.clone(), &settings.toss_base_url)))
            .with_tester(Arc::new(IamportTester::new(client.clone(), &settings.iamport_base_url)))
            .with_tester(Arc::new(StripeTester::new(client.clone(), &settings.stripe_base_url)))
            .with_tester(Arc::new(PaypalTester::new(
                client,
                &settings.paypal_live_base_url,
                &settings.paypal_sandbox_base_url,
            ))))
    }

    /// Appends a tester. Earlier registrations win for shared providers.
    #[must_use]
    pub fn with_tester(mut self, tester: Arc<dyn ConnectionTester>) -> Self {
        self.register(tester);
        self
    }

    /// Appends a tester.
    pub fn register(&mut self, tester: Arc<dyn ConnectionTester>) {
        self.testers.push(tester);
    }

    /// The tester that would handle `provider`.
    #[must_use]
    pub fn tester_for(&self, provider: PgProvider) -> Option<&Arc<dyn ConnectionTester>> {
        self.testers.iter().find(|t| t.supports(provider))
    }

    /// Whether any tester handles `provider`.
    #[must_use]
    pub fn supports(&self, provider: PgProvider) -> bool {
        self.tester_for(provider).is_some()
    }

    /// Per-call bound.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs a connection test.
    ///
    /// Fails only when no tester supports the provider; every provider-side
    /// failure comes back as a result.
    pub async fn test(&self, credentials: &ProviderCredentials) -> Result<ConnectionTestResult> {
        let provider = credentials.provider;
        let tester = self
            .tester_for(provider)
            .ok_or(ServiceError::UnsupportedProvider { provider })?;

        let started = Instant::now();
        let mut result = match tokio::time::timeout(self.timeout, tester.test(credentials)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = %provider,
                    tester = tester.name(),
                    timeout_ms = self.timeout.as_millis(),
                    "Connection test timed out"
                );
                ConnectionTestResult::timeout(format!(
                    "{} did not respond within {} ms",
                    provider.display_name(),
                    self.timeout.as_millis()
                ))
            }
        };
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            provider = %provider,
            tester = tester.name(),
            outcome = %result.outcome,
            duration_ms = result.duration_ms,
            "Connection test finished"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for ConnectionTestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTestDispatcher")
            .field("testers", &self.testers.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tester::credentials;
    use async_trait::async_trait;
    use axum::extract::Json;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::{get, post};
    use axum::Router;
    use pgvault_core::types::ConnectionTestOutcome;
    use serde_json::{Value, json};

    struct Fixed(PgProvider, &'static str, ConnectionTestOutcome);

    #[async_trait]
    impl ConnectionTester for Fixed {
        fn name(&self) -> &'static str {
            self.1
        }

        fn supports(&self, provider: PgProvider) -> bool {
            provider == self.0
        }

        async fn test(&self, _credentials: &ProviderCredentials) -> ConnectionTestResult {
            match self.2 {
                ConnectionTestOutcome::Success => ConnectionTestResult::success(self.1),
                _ => ConnectionTestResult::failed(self.1),
            }
        }
    }

    struct Hangs;

    #[async_trait]
    impl ConnectionTester for Hangs {
        fn name(&self) -> &'static str {
            "hangs"
        }

        fn supports(&self, _provider: PgProvider) -> bool {
            true
        }

        async fn test(&self, _credentials: &ProviderCredentials) -> ConnectionTestResult {
            tokio::time::sleep(Duration::from_secs(30)).await;
            ConnectionTestResult::success("unreachable")
        }
    }

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers.get(header::AUTHORIZATION)?.to_str().ok()
    }

    async fn mock_provider() -> String {
        let app = Router::new()
            .route(
                "/v1/payments/orders/{id}",
                get(|headers: HeaderMap| async move {
                    // "good_sk:" base64-encoded
                    if bearer(&headers) == Some("Basic Z29vZF9zazo=") {
                        (StatusCode::NOT_FOUND, Json(json!({"code": "NOT_FOUND_PAYMENT"})))
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"code": "UNAUTHORIZED_KEY", "message": "invalid key"})),
                        )
                    }
                }),
            )
            .route(
                "/users/getToken",
                post(|Json(body): Json<Value>| async move {
                    if body["imp_secret"] == "good" {
                        Json(json!({"code": 0, "response": {"access_token": "t"}}))
                    } else {
                        Json(json!({"code": -1, "message": "invalid imp_secret"}))
                    }
                }),
            )
            .route(
                "/v1/balance",
                get(|headers: HeaderMap| async move {
                    if bearer(&headers) == Some("Bearer sk_test_good") {
                        (StatusCode::OK, Json(json!({"object": "balance"})))
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"error": {"type": "invalid_request_error"}})),
                        )
                    }
                }),
            )
            .route(
                "/sandbox/v1/oauth2/token",
                post(|| async { Json(json!({"access_token": "A21", "token_type": "Bearer"})) }),
            )
            .route(
                "/live/v1/oauth2/token",
                post(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({
                            "error": "invalid_client",
                            "error_description": "Client Authentication failed"
                        })),
                    )
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn dispatcher() -> ConnectionTestDispatcher {
        let base = mock_provider().await;
        let settings = ConnectionTestSettings {
            toss_base_url: base.clone(),
            iamport_base_url: base.clone(),
            stripe_base_url: base.clone(),
            paypal_live_base_url: format!("{base}/live"),
            paypal_sandbox_base_url: format!("{base}/sandbox"),
            ..ConnectionTestSettings::default()
        };
        ConnectionTestDispatcher::from_settings(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_toss_confirm_call() {
        let d = dispatcher().await;
        let ok = d.test(&credentials(PgProvider::Toss, "ck", "good_sk")).await.unwrap();
        assert!(ok.success, "{}", ok.message);

        let bad = d.test(&credentials(PgProvider::Toss, "ck", "bad_sk")).await.unwrap();
        assert!(!bad.success);
        assert_eq!(bad.outcome, ConnectionTestOutcome::Failed);
        assert!(bad.message.contains("invalid key"));
        assert_eq!(bad.details.unwrap()["http_status"], 401);
    }

    #[tokio::test]
    async fn test_iamport_token() {
        let d = dispatcher().await;
        assert!(d.test(&credentials(PgProvider::Iamport, "key", "good")).await.unwrap().success);
        let bad = d.test(&credentials(PgProvider::Iamport, "key", "nope")).await.unwrap();
        assert!(bad.message.contains("invalid imp_secret"));
    }

    #[tokio::test]
    async fn test_stripe_balance() {
        let d = dispatcher().await;
        let good_creds = credentials(PgProvider::Stripe, "pk", "sk_test_good");
        let good = d.test(&good_creds);
        assert!(good.await.unwrap().success);
        let bad_creds = credentials(PgProvider::Stripe, "pk", "sk_test_bad");
        let bad = d.test(&bad_creds);
        assert!(!bad.await.unwrap().success);
    }

    #[tokio::test]
    async fn test_paypal_environment_follows_test_mode() {
        let d = dispatcher().await;
        let mut creds = credentials(PgProvider::Paypal, "client", "secret");
        assert!(d.test(&creds).await.unwrap().success);

        creds.test_mode = false;
        let live = d.test(&creds).await.unwrap();
        assert!(!live.success);
        assert!(live.message.contains("Client Authentication failed"));
    }

    #[tokio::test]
    async fn test_blank_keys_fail_without_network() {
        let settings = ConnectionTestSettings {
            stripe_base_url: "http://127.0.0.1:1".to_string(),
            ..ConnectionTestSettings::default()
        };
        let d = ConnectionTestDispatcher::from_settings(&settings).unwrap();
        let result = d.test(&credentials(PgProvider::Stripe, "pk", "")).await.unwrap();
        assert_eq!(result.outcome, ConnectionTestOutcome::Failed);
        assert_eq!(result.message, "Secret key is missing");
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_error() {
        let d = dispatcher().await;
        let err = d.test(&credentials(PgProvider::Kakao, "a", "b")).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::UnsupportedProvider {
                provider: PgProvider::Kakao
            }
        );
    }

    #[tokio::test]
    async fn test_first_registered_tester_wins() {
        let d = ConnectionTestDispatcher::new(Duration::from_secs(1))
            .with_tester(Arc::new(Fixed(
                PgProvider::Naver,
                "first",
                ConnectionTestOutcome::Success,
            )))
            .with_tester(Arc::new(Fixed(
                PgProvider::Naver,
                "second",
                ConnectionTestOutcome::Failed,
            )));
        let result = d.test(&credentials(PgProvider::Naver, "a", "b")).await.unwrap();
        assert_eq!(result.message, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_tester_times_out() {
        let d =
            ConnectionTestDispatcher::new(Duration::from_millis(200)).with_tester(Arc::new(Hangs));
        let result = d.test(&credentials(PgProvider::Toss, "a", "b")).await.unwrap();
        assert_eq!(result.outcome, ConnectionTestOutcome::Timeout);
        assert!(!result.success);
    }
}
