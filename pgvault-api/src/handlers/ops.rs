//! Operator handlers: approval queue and lifecycle transitions.
//!
//! Role checks happen in the service so every entry point shares them.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use pgvault_core::types::PgProvider;
use pgvault_service::configuration::{ApproveRequest, RejectRequest};
use pgvault_service::connection::ConnectionTestResult;
use serde::Deserialize;
use std::sync::Arc;

use super::{parse_config_id, parse_tenant};
use crate::error::ApiResult;
use crate::middleware::Ctx;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::views::{ConfigurationView, DetailView, views};

/// Pending-approval filters.
#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    /// Restrict to one tenant.
    pub tenant_id: Option<String>,
    /// Restrict to one provider.
    pub provider: Option<PgProvider>,
}

/// Configurations awaiting a decision.
///
/// GET /api/v1/ops/pg-configurations/pending
pub async fn pending_approvals(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Query(query): Query<PendingQuery>,
) -> ApiResult<ApiResponse<Vec<ConfigurationView>>> {
    let tenant_id = query.tenant_id.as_deref().map(parse_tenant).transpose()?;
    let configs = state
        .service
        .list_pending_approvals(&ctx, tenant_id.as_ref(), query.provider)
        .await?;
    Ok(ApiResponse::list(views(configs)))
}

/// POST /api/v1/ops/pg-configurations/{config_id}/approve
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(config_id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let config_id = parse_config_id(&config_id)?;
    let config = state.service.approve(&ctx, &config_id, request).await?;
    Ok(ApiResponse::ok_with_message(config.into(), "Configuration approved"))
}

/// POST /api/v1/ops/pg-configurations/{config_id}/reject
pub async fn reject(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(config_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let config_id = parse_config_id(&config_id)?;
    let config = state.service.reject(&ctx, &config_id, request).await?;
    Ok(ApiResponse::ok_with_message(config.into(), "Configuration rejected"))
}

/// POST /api/v1/ops/pg-configurations/{config_id}/activate
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(config_id): Path<String>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let config_id = parse_config_id(&config_id)?;
    let config = state.service.activate(&ctx, &config_id).await?;
    Ok(ApiResponse::ok_with_message(config.into(), "Configuration activated"))
}

/// POST /api/v1/ops/pg-configurations/{config_id}/deactivate
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(config_id): Path<String>,
) -> ApiResult<ApiResponse<ConfigurationView>> {
    let config_id = parse_config_id(&config_id)?;
    let config = state.service.deactivate(&ctx, &config_id).await?;
    Ok(ApiResponse::ok_with_message(config.into(), "Configuration deactivated"))
}

/// GET /api/v1/ops/pg-configurations/{config_id}/history
pub async fn history(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(config_id): Path<String>,
) -> ApiResult<ApiResponse<DetailView>> {
    let config_id = parse_config_id(&config_id)?;
    let detail = state.service.ops_detail(&ctx, &config_id).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// POST /api/v1/ops/pg-configurations/{config_id}/test-connection
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
    Path(config_id): Path<String>,
) -> ApiResult<ApiResponse<ConnectionTestResult>> {
    let config_id = parse_config_id(&config_id)?;
    let result = state.service.ops_test_connection(&ctx, &config_id).await?;
    Ok(ApiResponse::ok(result))
}
