//! API middleware components.
//!
//! This module provides middleware for:
//! - Request ID generation
//! - Tenant resolution and request-context scoping

mod request_id;
mod tenant;

pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer};
pub use tenant::{Ctx, USER_ID_HEADER, USER_ROLES_HEADER, principal_from_headers, tenant_context};
