//! Tenant-facing configuration handlers.
//!
//! Every route carries the tenant in its path; the service checks it against
//! the resolved request tenant before touching storage.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use pgvault_service::configuration::{
    CreateConfigurationRequest, ListQuery, UpdateConfigurationRequest,
};
use pgvault_service::connection::ConnectionTestResult;
use std::sync::Arc;
use tracing::info;

use super::{parse_config_id, parse_provider, parse_tenant};
use crate::error::{ApiError, ApiResult};
use crate::middleware::Ctx;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::views::{ConfigurationView, DetailView, views};

/// List a tenant's configurations.
///
/// GET /api/v1/tenants/{tenant_id}/pg-configurations
pub async fn list_configurations(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(tenant_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ApiResponse<Vec<ConfigurationView>>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let configs = state.service.list(&ctx, &tenant_id, query).await?;
    Ok(ApiResponse::list(views(configs)))
}

/// Configuration detail with history.
///
/// GET /api/v1/tenants/{tenant_id}/pg-configurations/{config_id}
pub async fn get_configuration(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path((tenant_id, config_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<DetailView>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let config_id = parse_config_id(&config_id)?;
    let detail = state.service.get_detail(&ctx, &tenant_id, &config_id).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Register a configuration; it starts pending approval.
///
/// POST /api/v1/tenants/{tenant_id}/pg-configurations
pub async fn create_configuration(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(tenant_id): Path<String>,
    Json(request): Json<CreateConfigurationRequest>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    info!(
        tenant_id = %tenant_id,
        provider = %request.provider,
        "Configuration registration requested"
    );
    let config = state.service.create(&ctx, &tenant_id, request).await?;
    Ok(ApiResponse::created(
        config.into(),
        "Configuration registered and awaiting approval",
    ))
}

/// Edit a configuration; it returns to pending approval.
///
/// PUT /api/v1/tenants/{tenant_id}/pg-configurations/{config_id}
pub async fn update_configuration(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path((tenant_id, config_id)): Path<(String, String)>,
    Json(request): Json<UpdateConfigurationRequest>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let config_id = parse_config_id(&config_id)?;
    let config = state
        .service
        .update(&ctx, &tenant_id, &config_id, request)
        .await?;
    Ok(ApiResponse::ok_with_message(
        config.into(),
        "Configuration updated; re-approval required",
    ))
}

/// Soft-delete a configuration.
///
/// DELETE /api/v1/tenants/{tenant_id}/pg-configurations/{config_id}
pub async fn delete_configuration(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path((tenant_id, config_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let config_id = parse_config_id(&config_id)?;
    state.service.delete(&ctx, &tenant_id, &config_id).await?;
    Ok(ApiResponse::done("Configuration deleted"))
}

/// Run a live connection test.
///
/// POST /api/v1/tenants/{tenant_id}/pg-configurations/{config_id}/test-connection
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path((tenant_id, config_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<ConnectionTestResult>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let config_id = parse_config_id(&config_id)?;
    let result = state
        .service
        .test_connection(&ctx, &tenant_id, &config_id)
        .await?;
    Ok(ApiResponse::ok(result))
}

/// Configurations currently carrying payment traffic.
///
/// GET /api/v1/tenants/{tenant_id}/pg-configurations/active
pub async fn active_configurations(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(tenant_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<ConfigurationView>>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let configs = state.service.active_configurations(&ctx, &tenant_id).await?;
    Ok(ApiResponse::list(views(configs)))
}

/// The live configuration for one provider.
///
/// GET /api/v1/tenants/{tenant_id}/pg-configurations/active/{provider}
pub async fn active_configuration(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path((tenant_id, provider)): Path<(String, String)>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let tenant_id = parse_tenant(&tenant_id)?;
    let provider = parse_provider(&provider)?;
    state
        .service
        .active_configuration(&ctx, &tenant_id, provider)
        .await?
        .map(|config| ApiResponse::ok(config.into()))
        .ok_or_else(|| {
            ApiError::NotFound(format!("No active {provider} configuration for tenant {tenant_id}"))
        })
}
