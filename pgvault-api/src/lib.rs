//! # PgVault API
//!
//! HTTP surface for tenant payment-gateway configuration.
//!
//! - `/api/v1/health` - Health check
//! - `/api/v1/tenants/{tenant_id}/pg-configurations` - Tenant registration,
//!   editing, deletion and connection tests
//! - `/api/v1/ops/pg-configurations` - Approval queue and lifecycle
//!   transitions for operators
//!
//! # Tenant resolution
//!
//! Every configuration route runs behind [`middleware::tenant_context`], which
//! resolves the tenant from the `X-Tenant-Id` header, the `Host` subdomain or
//! the session, and scopes the handler to the resulting request context.
//! Caller identity is taken from `X-User-Id` and `X-User-Roles`, set by the
//! authenticating proxy in front of this service.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod views;


pub use error::{ApiError, ApiResult};
pub use routes::{build_app, create_router};
pub use server::{ApiServer, BoundServer};
pub use state::AppState;
