//! Tenant-isolation access control.
//!
//! - [`Role`] / [`RoleSet`] - caller roles, with `OPS` as the isolation-bypass role
//! - [`AccessControl`] - allow/deny decisions over a
//!   [`RequestContext`](crate::tenant::RequestContext)

mod control;
mod role;

pub use control::AccessControl;
pub use role::{Role, RoleSet};
