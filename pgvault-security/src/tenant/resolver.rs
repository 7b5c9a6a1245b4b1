//! Per-request tenant and branch resolution.
//!
//! Tenant tiers, first match wins:
//! 1. explicit tenant header
//! 2. `Host` subdomain under a configured base domain, reserved labels excluded
//! 3. tenant of the session's authenticated user, looked up in a [`UserDirectory`]
//! 4. tenant cached on the session by an earlier resolution
//!
//! Branch resolution runs the same tiers independently: branch header, user
//! lookup, session branch id, session branch code. A request matching no tier
//! is left without a tenant; nothing is defaulted.

use async_trait::async_trait;
use pgvault_core::config::TenantSettings;
use pgvault_core::types::{BranchId, TenantId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::context::TenantContext;
use crate::error::Result;

/// Read access to an inbound request.
pub trait RequestMeta: Sync {
    /// Returns a header value; names are matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// Returns the `Host` header.
    fn host(&self) -> Option<&str> {
        self.header("host")
    }
}

/// Mutable per-session attribute bag.
pub trait Session: Send + Sync {
    /// Reads an attribute.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes an attribute.
    fn set(&self, key: &str, value: String);
}

/// Where a user belongs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAffiliation {
    /// Tenant of the user's organization.
    pub tenant_id: Option<TenantId>,
    /// Branch the user is assigned to.
    pub branch_id: Option<BranchId>,
    /// Branch code, when only the code is known.
    pub branch_code: Option<String>,
}

/// Looks up users' organizations. Implemented by the account subsystem.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the affiliation of a user, if known.
    async fn affiliation(&self, user_id: &str) -> Result<Option<UserAffiliation>>;

    /// Maps a branch code to a branch id.
    async fn branch_by_code(&self, code: &str) -> Result<Option<BranchId>> {
        Ok(BranchId::new(code).ok())
    }
}

/// Which tier produced the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantSource {
    /// Explicit header.
    Header,
    /// Host subdomain.
    Subdomain,
    /// Authenticated-user lookup.
    UserLookup,
    /// Session cache.
    SessionCache,
}

/// Which tier produced the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSource {
    /// Explicit header.
    Header,
    /// Authenticated-user lookup.
    UserLookup,
    /// Session-cached branch id.
    SessionBranchId,
    /// Session-cached branch code.
    SessionBranchCode,
}

/// Outcome of a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// The resolved context.
    pub context: TenantContext,
    /// Tier that produced the tenant.
    pub tenant_source: Option<TenantSource>,
    /// Tier that produced the branch.
    pub branch_source: Option<BranchSource>,
}

/// Resolves a [`TenantContext`] from request metadata and session state.
pub struct TenantResolver {
    settings: TenantSettings,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl TenantResolver {
    /// Creates a resolver without user lookup.
    #[must_use]
    pub fn new(settings: TenantSettings) -> Self {
        Self {
            settings,
            directory: None,
        }
    }

    /// Enables the authenticated-user tier.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Returns the resolver settings.
    #[must_use]
    pub fn settings(&self) -> &TenantSettings {
        &self.settings
    }

    /// Resolves tenant and branch for one request.
    ///
    /// The user directory is consulted at most once, and only when the
    /// explicit and cached tiers all miss.
    pub async fn resolve(
        &self,
        request: &dyn RequestMeta,
        session: Option<&dyn Session>,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let mut affiliation = None;

        if let Some((tenant, source)) =
            self.resolve_tenant(request, session, &mut affiliation).await
        {
            resolution.context.set_tenant(tenant);
            resolution.tenant_source = Some(source);
        }
        if let Some((branch, source)) =
            self.resolve_branch(request, session, &mut affiliation).await
        {
            resolution.context.set_branch(branch);
            resolution.branch_source = Some(source);
        }

        debug!(
            tenant_id = ?resolution.context.tenant_id().map(TenantId::as_str),
            tenant_source = ?resolution.tenant_source,
            branch_source = ?resolution.branch_source,
            directory_consulted = affiliation.is_some(),
            "Resolved request tenant"
        );
        resolution
    }

    async fn resolve_tenant(
        &self,
        request: &dyn RequestMeta,
        session: Option<&dyn Session>,
        affiliation: &mut Option<Option<UserAffiliation>>,
    ) -> Option<(TenantId, TenantSource)> {
        if let Some(raw) = request.header(&self.settings.tenant_header) {
            match TenantId::new(raw.trim()) {
                Ok(tenant) => return Some((tenant, TenantSource::Header)),
                Err(e) => warn!(
                    header = %self.settings.tenant_header,
                    error = %e,
                    "Ignoring malformed tenant header"
                ),
            }
        }

        if let Some(tenant) = request.host().and_then(|host| self.tenant_from_host(host)) {
            self.remember(session, &self.settings.session_tenant_key, tenant.as_str());
            return Some((tenant, TenantSource::Subdomain));
        }

        if let Some(tenant) = session
            .and_then(|s| s.get(&self.settings.session_tenant_key))
            .and_then(|raw| TenantId::new(raw).ok())
        {
            return Some((tenant, TenantSource::SessionCache));
        }

        let tenant = self
            .affiliation(session, affiliation)
            .await
            .and_then(|a| a.tenant_id.clone())?;
        self.remember(session, &self.settings.session_tenant_key, tenant.as_str());
        Some((tenant, TenantSource::UserLookup))
    }

    async fn resolve_branch(
        &self,
        request: &dyn RequestMeta,
        session: Option<&dyn Session>,
        affiliation: &mut Option<Option<UserAffiliation>>,
    ) -> Option<(BranchId, BranchSource)> {
        if let Some(raw) = request.header(&self.settings.branch_header) {
            match BranchId::new(raw.trim()) {
                Ok(branch) => return Some((branch, BranchSource::Header)),
                Err(e) => warn!(
                    header = %self.settings.branch_header,
                    error = %e,
                    "Ignoring malformed branch header"
                ),
            }
        }

        let session = session?;
        if let Some(branch) = session
            .get(&self.settings.session_branch_key)
            .and_then(|raw| BranchId::new(raw).ok())
        {
            return Some((branch, BranchSource::SessionBranchId));
        }

        if let Some(branch) = self
            .affiliation(Some(session), affiliation)
            .await
            .and_then(|a| a.branch_id.clone())
        {
            self.remember(Some(session), &self.settings.session_branch_key, branch.as_str());
            return Some((branch, BranchSource::UserLookup));
        }

        let code = session.get(&self.settings.session_branch_code_key)?;
        let branch = match &self.directory {
            Some(directory) => match directory.branch_by_code(&code).await {
                Ok(branch) => branch,
                Err(e) => {
                    warn!(error = %e, "Branch code lookup failed");
                    None
                }
            },
            None => BranchId::new(code).ok(),
        }?;
        Some((branch, BranchSource::SessionBranchCode))
    }

    /// Directory affiliation of the session's user, fetched on first use.
    async fn affiliation<'m>(
        &self,
        session: Option<&dyn Session>,
        memo: &'m mut Option<Option<UserAffiliation>>,
    ) -> Option<&'m UserAffiliation> {
        if memo.is_none() {
            let found = match session {
                Some(session) => self.lookup_affiliation(session).await,
                None => None,
            };
            *memo = Some(found);
        }
        memo.as_ref().and_then(Option::as_ref)
    }

    async fn lookup_affiliation(&self, session: &dyn Session) -> Option<UserAffiliation> {
        let directory = self.directory.as_ref()?;
        let user_id = session.get(&self.settings.session_user_key)?;
        match directory.affiliation(&user_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User affiliation lookup failed");
                None
            }
        }
    }

    /// Caches a resolved value on sessions that belong to an authenticated user.
    fn remember(&self, session: Option<&dyn Session>, key: &str, value: &str) {
        if let Some(session) = session
            && session.get(&self.settings.session_user_key).is_some()
        {
            session.set(key, value.to_string());
        }
    }

    /// Extracts a tenant from a `Host` value.
    ///
    /// The port is stripped, the host must end in `.<base-domain>` for a
    /// configured base domain, and the remaining prefix must be a single
    /// non-reserved label.
    #[must_use]
    pub fn tenant_from_host(&self, host: &str) -> Option<TenantId> {
        let host = host.trim();
        if host.starts_with('[') {
            return None;
        }
        let host = host
            .rsplit_once(':')
            .map_or(host, |(name, port)| {
                if port.chars().all(|c| c.is_ascii_digit()) {
                    name
                } else {
                    host
                }
            })
            .trim_end_matches('.')
            .to_ascii_lowercase();

        self.settings.base_domains.iter().find_map(|base| {
            let base = base.trim().trim_start_matches('.').to_ascii_lowercase();
            let label = host.strip_suffix(base.as_str())?.strip_suffix('.')?;
            if label.is_empty() || label.contains('.') {
                return None;
            }
            if self
                .settings
                .reserved_subdomains
                .iter()
                .any(|r| r.eq_ignore_ascii_case(label))
            {
                return None;
            }
            TenantId::new(label).ok()
        })
    }
}
