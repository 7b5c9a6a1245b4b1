//! Request-scoped tenant context.
//!
//! A [`RequestContext`] is bound to exactly one request. [`RequestContext::scope`]
//! installs it as a task-local for the lifetime of a future; when the future
//! completes, errors, panics or is dropped, the binding is gone. Nothing is
//! stored in process-wide state, so a reused worker can never observe a
//! previous request's tenant.

use pgvault_core::types::{BranchId, TenantId};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::access::RoleSet;
use crate::error::{Result, SecurityError};

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Actor name recorded when no authenticated user is present.
pub const SYSTEM_ACTOR: &str = "system";

/// Resolved `(tenant, branch)` pair for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
    branch_id: Option<BranchId>,
}

impl TenantContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for a tenant.
    #[must_use]
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            branch_id: None,
        }
    }

    /// Sets the tenant.
    pub fn set_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    /// Sets the branch.
    pub fn set_branch(&mut self, branch_id: BranchId) {
        self.branch_id = Some(branch_id);
    }

    /// Clears both identifiers.
    pub fn clear(&mut self) {
        self.tenant_id = None;
        self.branch_id = None;
    }

    /// Resolved tenant, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    /// Resolved branch, if any.
    #[must_use]
    pub fn branch_id(&self) -> Option<&BranchId> {
        self.branch_id.as_ref()
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User identifier.
    pub user_id: String,
    /// Roles held.
    pub roles: RoleSet,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(user_id: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }
}

/// Everything downstream code may know about the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Resolved tenant and branch.
    pub tenant: TenantContext,
    /// Authenticated caller, if any.
    pub principal: Option<Principal>,
}

impl RequestContext {
    /// Creates a context.
    #[must_use]
    pub fn new(tenant: TenantContext, principal: Option<Principal>) -> Self {
        Self { tenant, principal }
    }

    /// Returns the resolved tenant or an illegal-state error naming `operation`.
    pub fn require_tenant(&self, operation: &str) -> Result<&TenantId> {
        self.tenant
            .tenant_id()
            .ok_or_else(|| SecurityError::no_tenant_context(operation))
    }

    /// Returns the actor name for audit rows.
    #[must_use]
    pub fn actor(&self) -> &str {
        self.principal
            .as_ref()
            .map_or(SYSTEM_ACTOR, |p| p.user_id.as_str())
    }

    /// Returns the caller's roles; empty when unauthenticated.
    #[must_use]
    pub fn roles(&self) -> RoleSet {
        self.principal
            .as_ref()
            .map(|p| p.roles.clone())
            .unwrap_or_default()
    }

    /// Runs `fut` with this context bound as the current request.
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, fut).await
    }

    /// Returns a copy of the context bound to the running task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.try_with(Clone::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;

    fn ctx(tenant: &str) -> RequestContext {
        RequestContext::new(
            TenantContext::for_tenant(TenantId::new(tenant).unwrap()),
            Some(Principal::new("alice", RoleSet::new().with(Role::Member))),
        )
    }

    #[test]
    fn test_require_tenant() {
        let empty = RequestContext::default();
        let err = empty.require_tenant("create").unwrap_err();
        assert!(err.is_illegal_state());
        assert_eq!(ctx("acme").require_tenant("create").unwrap().as_str(), "acme");
    }

    #[test]
    fn test_actor_defaults_to_system() {
        assert_eq!(RequestContext::default().actor(), SYSTEM_ACTOR);
        assert_eq!(ctx("acme").actor(), "alice");
    }

    #[test]
    fn test_tenant_context_clear() {
        let mut tenant = TenantContext::for_tenant(TenantId::new("acme").unwrap());
        tenant.set_branch(BranchId::new("b1").unwrap());
        tenant.clear();
        assert_eq!(tenant, TenantContext::new());
    }

    #[tokio::test]
    async fn test_scope_binds_and_releases() {
        assert!(RequestContext::current().is_none());
        let seen = ctx("acme")
            .scope(async { RequestContext::current().map(|c| c.actor().to_string()) })
            .await;
        assert_eq!(seen.as_deref(), Some("alice"));
        assert!(RequestContext::current().is_none());
    }

    #[tokio::test]
    async fn test_scope_released_after_error_path() {
        let result: std::result::Result<(), &str> = ctx("acme").scope(async { Err("boom") }).await;
        assert!(result.is_err());
        assert!(RequestContext::current().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_scopes_do_not_leak() {
        let a = tokio::spawn(ctx("acme").scope(async {
            tokio::task::yield_now().await;
            RequestContext::current().and_then(|c| c.tenant.tenant_id().cloned())
        }));
        let b = tokio::spawn(ctx("globex").scope(async {
            tokio::task::yield_now().await;
            RequestContext::current().and_then(|c| c.tenant.tenant_id().cloned())
        }));
        assert_eq!(a.await.unwrap().unwrap().as_str(), "acme");
        assert_eq!(b.await.unwrap().unwrap().as_str(), "globex");
    }
}
