//! Append-only change trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{ApprovalStatus, ConfigId, PgConfigurationStatus, TenantId};

/// Kind of state change recorded in the history trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Registration requested.
    Created,
    /// Credentials or metadata changed by the tenant.
    Updated,
    /// Approved by an operator.
    Approved,
    /// Rejected by an operator.
    Rejected,
    /// Put into service.
    Activated,
    /// Taken out of service.
    Deactivated,
    /// Credentials re-encrypted under the active key.
    KeyRotated,
    /// Soft-deleted.
    Deleted,
    /// Connection-test result recorded.
    ConnectionTested,
}

impl ChangeType {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Activated => "ACTIVATED",
            Self::Deactivated => "DEACTIVATED",
            Self::KeyRotated => "KEY_ROTATED",
            Self::Deleted => "DELETED",
            Self::ConnectionTested => "CONNECTION_TESTED",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgConfigurationHistory {
    /// Row identifier.
    pub id: Uuid,
    /// Configuration this row belongs to.
    pub config_id: ConfigId,
    /// Owning tenant, denormalised for per-tenant audit queries.
    pub tenant_id: TenantId,
    /// What happened.
    pub change_type: ChangeType,
    /// Operational status before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<PgConfigurationStatus>,
    /// Operational status after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<PgConfigurationStatus>,
    /// Approval status before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_approval_status: Option<ApprovalStatus>,
    /// Approval status after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_approval_status: Option<ApprovalStatus>,
    /// Actor.
    pub changed_by: String,
    /// Timestamp.
    pub changed_at: DateTime<Utc>,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Structured snapshot or diff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PgConfigurationHistory {
    /// Creates a history row stamped with the current time.
    #[must_use]
    pub fn new(
        config_id: ConfigId,
        tenant_id: TenantId,
        change_type: ChangeType,
        changed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config_id,
            tenant_id,
            change_type,
            old_status: None,
            new_status: None,
            old_approval_status: None,
            new_approval_status: None,
            changed_by: changed_by.into(),
            changed_at: Utc::now(),
            notes: None,
            details: None,
        }
    }

    /// Records an operational status transition.
    #[must_use]
    pub fn with_status(mut self, old: PgConfigurationStatus, new: PgConfigurationStatus) -> Self {
        self.old_status = Some(old);
        self.new_status = Some(new);
        self
    }

    /// Records an approval status transition.
    #[must_use]
    pub fn with_approval(mut self, old: ApprovalStatus, new: ApprovalStatus) -> Self {
        self.old_approval_status = Some(old);
        self.new_approval_status = Some(new);
        self
    }

    /// Attaches notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attaches a structured payload.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_transition() {
        let row = PgConfigurationHistory::new(
            ConfigId::new(),
            TenantId::new("acme").unwrap(),
            ChangeType::Activated,
            "bob",
        )
        .with_status(PgConfigurationStatus::Pending, PgConfigurationStatus::Active)
        .with_notes("go live");

        assert_eq!(row.old_status, Some(PgConfigurationStatus::Pending));
        assert_eq!(row.new_status, Some(PgConfigurationStatus::Active));
        assert_eq!(row.notes.as_deref(), Some("go live"));
        assert!(row.old_approval_status.is_none());
    }

    #[test]
    fn test_change_type_wire_name() {
        assert_eq!(ChangeType::KeyRotated.to_string(), "KEY_ROTATED");
        assert_eq!(
            serde_json::to_string(&ChangeType::ConnectionTested).unwrap(),
            "\"CONNECTION_TESTED\""
        );
    }
}
