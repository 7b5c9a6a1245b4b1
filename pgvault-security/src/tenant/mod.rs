//! Request-scoped tenant resolution.
//!
//! - [`TenantResolver`] - derives `(tenant, branch)` from headers, host and session
//! - [`RequestContext`] - the per-request binding read by access control and services

mod context;
mod resolver;

pub use context::{Principal, RequestContext, SYSTEM_ACTOR, TenantContext};
pub use resolver::{
    BranchSource, RequestMeta, Resolution, Session, TenantResolver, TenantSource, UserAffiliation,
    UserDirectory,
};
