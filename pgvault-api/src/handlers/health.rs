//! Liveness probe.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Body of `GET /api/v1/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy`.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Key version new credentials are sealed with.
    pub active_key_version: u32,
    /// Sessions currently holding cached tenant attributes.
    pub cached_sessions: usize,
}

/// Reports the process as up. Needs no tenant.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        active_key_version: state.service.active_key_version(),
        cached_sessions: state.sessions.len(),
    })
}
