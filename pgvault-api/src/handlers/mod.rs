//! API request handlers.

pub mod configurations;
pub mod health;
pub mod ops;

use pgvault_core::types::{ConfigId, PgProvider, TenantId};

use crate::error::{ApiError, ApiResult};

fn parse_tenant(raw: &str) -> ApiResult<TenantId> {
    TenantId::new(raw).map_err(|e| ApiError::BadRequest(format!("Invalid tenant id: {e}")))
}

fn parse_config_id(raw: &str) -> ApiResult<ConfigId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid configuration id: {raw}")))
}

fn parse_provider(raw: &str) -> ApiResult<PgProvider> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid provider: {e}")))
}
