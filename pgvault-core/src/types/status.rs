//! Lifecycle enums.
//!
//! Operational status and approval status are independent axes. Activation
//! is gated on approval by guard methods on
//! [`PgConfiguration`](super::PgConfiguration), never by enum ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Operational state of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgConfigurationStatus {
    /// Registered, not yet live.
    #[default]
    Pending,
    /// Live for payment traffic.
    Active,
    /// Taken out of service.
    Inactive,
    /// Rejected by an operator.
    Rejected,
}

impl PgConfigurationStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for PgConfigurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PgConfigurationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(ValidationError::UnknownStatus {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Governance state of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting an operator decision.
    #[default]
    Pending,
    /// Credentials vetted by an operator.
    Approved,
    /// Credentials refused by an operator.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(ValidationError::UnknownStatus {
                kind: "approval status",
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of a live credential check against a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionTestOutcome {
    /// Provider accepted the credentials.
    Success,
    /// Credentials missing, refused, or the call errored.
    Failed,
    /// Provider did not answer within the configured bound.
    Timeout,
}

impl ConnectionTestOutcome {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Returns true for [`ConnectionTestOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ConnectionTestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "active".parse::<PgConfigurationStatus>().unwrap(),
            PgConfigurationStatus::Active
        );
        assert!("LIVE".parse::<PgConfigurationStatus>().is_err());
    }

    #[test]
    fn test_approval_parse_and_default() {
        assert_eq!(ApprovalStatus::default(), ApprovalStatus::Pending);
        assert_eq!(
            "Approved".parse::<ApprovalStatus>().unwrap(),
            ApprovalStatus::Approved
        );
    }

    #[test]
    fn test_outcome_wire_name() {
        assert_eq!(
            serde_json::to_string(&ConnectionTestOutcome::Timeout).unwrap(),
            "\"TIMEOUT\""
        );
        assert!(ConnectionTestOutcome::Success.is_success());
    }
}
