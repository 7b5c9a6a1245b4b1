//! API route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::{configurations, health, ops};
use crate::middleware::{RequestIdLayer, tenant_context};
use crate::state::AppState;

/// Creates the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/health", get(health::health_check));

    let tenant_routes = Router::new()
        .route(
            "/tenants/{tenant_id}/pg-configurations",
            get(configurations::list_configurations).post(configurations::create_configuration),
        )
        .route(
            "/tenants/{tenant_id}/pg-configurations/active",
            get(configurations::active_configurations),
        )
        .route(
            "/tenants/{tenant_id}/pg-configurations/active/{provider}",
            get(configurations::active_configuration),
        )
        .route(
            "/tenants/{tenant_id}/pg-configurations/{config_id}",
            get(configurations::get_configuration)
                .put(configurations::update_configuration)
                .delete(configurations::delete_configuration),
        )
        .route(
            "/tenants/{tenant_id}/pg-configurations/{config_id}/test-connection",
            post(configurations::test_connection),
        )
        .layer(middleware::from_fn_with_state(state.clone(), tenant_context));

    let ops_routes = Router::new()
        .route("/pending", get(ops::pending_approvals))
        .route("/{config_id}/approve", post(ops::approve))
        .route("/{config_id}/reject", post(ops::reject))
        .route("/{config_id}/activate", post(ops::activate))
        .route("/{config_id}/deactivate", post(ops::deactivate))
        .route("/{config_id}/history", get(ops::history))
        .route("/{config_id}/test-connection", post(ops::test_connection))
        .layer(middleware::from_fn_with_state(state.clone(), tenant_context));

    Router::new()
        .nest("/api/v1", public_routes.merge(tenant_routes))
        .nest("/api/v1/ops/pg-configurations", ops_routes)
        .with_state(state)
}

/// Router plus the request-id layer, without transport concerns.
pub fn build_app(state: Arc<AppState>) -> Router {
    create_router(state).layer(RequestIdLayer::new())
}
