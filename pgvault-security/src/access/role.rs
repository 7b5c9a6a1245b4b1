//! Caller roles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A role held by the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Internal operations staff: crosses tenant boundaries and governs approvals.
    Ops,
    /// Administrator of one tenant.
    TenantAdmin,
    /// Regular tenant member.
    Member,
}

impl Role {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ops => "OPS",
            Self::TenantAdmin => "TENANT_ADMIN",
            Self::Member => "MEMBER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts `OPS`, `ops` and the `ROLE_`-prefixed form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("ROLE_").unwrap_or(&upper) {
            "OPS" => Ok(Self::Ops),
            "TENANT_ADMIN" => Ok(Self::TenantAdmin),
            "MEMBER" => Ok(Self::Member),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The set of roles held by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role.
    #[must_use]
    pub fn with(mut self, role: Role) -> Self {
        self.0.insert(role);
        self
    }

    /// Returns true if the role is held.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Returns true if the set holds the isolation-bypass role.
    #[must_use]
    pub fn has_ops(&self) -> bool {
        self.contains(Role::Ops)
    }

    /// Parses a comma-separated role list, ignoring unknown names.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value
            .split(',')
            .filter_map(|part| part.parse::<Role>().ok())
            .collect()
    }

    /// Iterates held roles in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
