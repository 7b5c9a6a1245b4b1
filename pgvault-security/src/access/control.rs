//! Tenant-isolation decisions.

use pgvault_core::types::{PgConfiguration, TenantId};
use tracing::{debug, warn};

use crate::error::{Result, SecurityError};
use crate::tenant::RequestContext;

/// Allow/deny decisions over a [`RequestContext`].
///
/// A caller may touch a tenant's resources only when the request resolved to
/// that tenant, or when the caller holds the `OPS` role.
#[derive(Debug, Clone, Copy)]
pub struct AccessControl {
    log_violations: bool,
}

impl Default for AccessControl {
    fn default() -> Self {
        Self {
            log_violations: true,
        }
    }
}

impl AccessControl {
    /// Creates an access controller that logs violations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables violation logging.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.log_violations = false;
        self
    }

    /// Checks that the request may act on `requested`.
    ///
    /// Fails with an illegal-state error when no tenant is resolved, even for
    /// operators.
    pub fn validate_tenant_access(&self, ctx: &RequestContext, requested: &TenantId) -> Result<()> {
        let current = ctx.require_tenant("tenant access check")?;

        if current == requested {
            debug!(tenant_id = %current, "Tenant access validated");
            return Ok(());
        }

        if self.has_ops_role(ctx) {
            debug!(
                tenant_id = %current,
                requested = %requested,
                actor = ctx.actor(),
                "Cross-tenant access granted to OPS caller"
            );
            return Ok(());
        }

        if self.log_violations {
            warn!(
                tenant_id = %current,
                requested = %requested,
                actor = ctx.actor(),
                "Tenant isolation violation"
            );
        }
        Err(SecurityError::tenant_access_denied(
            current.as_str(),
            requested.as_str(),
        ))
    }

    /// Applies [`validate_tenant_access`](Self::validate_tenant_access) to the
    /// tenant stored on a loaded row.
    pub fn validate_configuration_access(
        &self,
        ctx: &RequestContext,
        config: &PgConfiguration,
    ) -> Result<()> {
        self.validate_tenant_access(ctx, &config.tenant_id)
    }

    /// Returns whether the caller holds the `OPS` role.
    #[must_use]
    pub fn has_ops_role(&self, ctx: &RequestContext) -> bool {
        ctx.principal.as_ref().is_some_and(|p| p.roles.has_ops())
    }

    /// Fails unless the caller holds the `OPS` role.
    pub fn require_ops(&self, ctx: &RequestContext, operation: &str) -> Result<()> {
        if self.has_ops_role(ctx) {
            return Ok(());
        }
        if self.log_violations {
            warn!(operation, actor = ctx.actor(), "OPS-only operation refused");
        }
        Err(SecurityError::ops_role_required(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, RoleSet};
    use crate::tenant::{Principal, TenantContext};
    use pgvault_core::types::PgProvider;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn ctx(tenant_id: Option<&str>, roles: RoleSet) -> RequestContext {
        let tenant_ctx =
            tenant_id.map_or_else(TenantContext::new, |t| TenantContext::for_tenant(tenant(t)));
        RequestContext::new(tenant_ctx, Some(Principal::new("alice", roles)))
    }

    #[test]
    fn test_same_tenant_allowed() {
        let ac = AccessControl::new();
        let ctx = ctx(Some("t1"), RoleSet::new().with(Role::Member));
        assert!(ac.validate_tenant_access(&ctx, &tenant("t1")).is_ok());
    }

    #[test]
    fn test_foreign_tenant_denied() {
        let ac = AccessControl::new();
        let ctx = ctx(Some("t1"), RoleSet::new().with(Role::TenantAdmin));
        let err = ac.validate_tenant_access(&ctx, &tenant("t2")).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_ops_bypasses_tenant_match() {
        let ac = AccessControl::new();
        let ctx = ctx(Some("t1"), RoleSet::new().with(Role::Ops));
        assert!(ac.validate_tenant_access(&ctx, &tenant("t2")).is_ok());
        assert!(ac.has_ops_role(&ctx));
        assert!(ac.require_ops(&ctx, "approve").is_ok());
    }

    #[test]
    fn test_missing_tenant_is_illegal_state_even_for_ops() {
        let ac = AccessControl::new();
        let ctx = ctx(None, RoleSet::new().with(Role::Ops));
        let err = ac.validate_tenant_access(&ctx, &tenant("t1")).unwrap_err();
        assert!(err.is_illegal_state());
    }

    #[test]
    fn test_configuration_access_uses_row_tenant() {
        let ac = AccessControl::new().quiet();
        let row = PgConfiguration::new_pending(
            tenant("t2"),
            PgProvider::Toss,
            "a".into(),
            "b".into(),
            "bob",
        );
        let ctx = ctx(Some("t1"), RoleSet::new());
        assert!(ac.validate_configuration_access(&ctx, &row).unwrap_err().is_access_denied());
    }

    #[test]
    fn test_require_ops_denied_for_anonymous() {
        let ac = AccessControl::new();
        let err = ac.require_ops(&RequestContext::default(), "reject").unwrap_err();
        assert!(err.is_access_denied());
    }
}
