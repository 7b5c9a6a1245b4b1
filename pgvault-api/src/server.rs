//! HTTP listener.
//!
//! Binding and serving are separate steps so callers can learn the bound
//! address (port `0` picks a free one) before traffic starts.

use axum::Router;
use pgvault_core::config::ServerSettings;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::routes::build_app;
use crate::state::AppState;

/// Configured but not yet listening.
pub struct ApiServer {
    settings: ServerSettings,
    state: Arc<AppState>,
}

/// Listening socket plus the app it will serve.
pub struct BoundServer {
    listener: TcpListener,
    app: Router,
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub fn new(settings: ServerSettings, state: Arc<AppState>) -> Self {
        Self { settings, state }
    }

    /// Shared state handed to every request.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Resolves `host:port` and opens the socket.
    pub async fn bind(self) -> Result<BoundServer, ApiError> {
        let ServerSettings { host, port, .. } = &self.settings;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ApiError::Internal(format!("Invalid bind address {host}:{port}: {e}")))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to bind to {addr}: {e}")))?;

        let app = build_app(Arc::clone(&self.state))
            .layer(TimeoutLayer::new(self.settings.request_timeout()))
            .layer(TraceLayer::new_for_http());

        Ok(BoundServer {
            listener,
            app,
            state: self.state,
        })
    }

    /// Serves until the process is killed.
    pub async fn run(self) -> Result<(), ApiError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ApiError> {
        self.bind().await?.serve(shutdown).await
    }
}

impl BoundServer {
    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, ApiError> {
        self.listener
            .local_addr()
            .map_err(|e| ApiError::Internal(format!("Listener has no local address: {e}")))
    }

    /// Accepts connections until `shutdown` resolves. Idle sessions are swept
    /// while serving.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ApiError> {
        let addr = self.local_addr()?;
        info!(%addr, "API server listening");

        let sweeper = self.state.sessions.spawn_sweeper();
        let served = axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await;
        sweeper.abort();
        served.map_err(|e| ApiError::Internal(format!("Server error: {e}")))?;

        info!(%addr, "API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_state;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_invalid_bind_address_is_reported() {
        let settings = ServerSettings {
            host: "not an address".to_string(),
            ..ServerSettings::default()
        };
        let server = ApiServer::new(settings, test_state());
        let err = server.run_with_shutdown(async {}).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(msg) if msg.contains("Invalid bind address")));
    }

    #[tokio::test]
    async fn test_serves_health_over_tcp_until_shutdown() {
        let settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerSettings::default()
        };
        let bound = ApiServer::new(settings, test_state()).bind().await.unwrap();
        let addr = bound.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(bound.serve(async move {
            let _ = stopped.await;
        }));

        let response = reqwest::get(format!("http://{addr}/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
