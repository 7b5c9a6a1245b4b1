//! Security error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Security-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityError {
    /// No tenant resolved for an operation that requires one.
    #[error("No tenant context: {operation} requires a resolved tenant")]
    NoTenantContext {
        /// Operation that needed the tenant.
        operation: String,
    },

    /// Resolved tenant does not own the resource and the caller cannot bypass isolation.
    #[error("Access denied: tenant '{current}' cannot access resources of tenant '{requested}'")]
    TenantAccessDenied {
        /// Tenant resolved for the request.
        current: String,
        /// Tenant owning the resource.
        requested: String,
    },

    /// Operation is restricted to operators.
    #[error("Access denied: {operation} requires the OPS role")]
    OpsRoleRequired {
        /// Operation that was attempted.
        operation: String,
    },

    /// Encryption or decryption failed.
    #[error("Encryption error: {reason}")]
    Encryption {
        /// Reason for the failure.
        reason: String,
    },

    /// Stored value is not a well-formed versioned ciphertext.
    #[error("Invalid ciphertext: {reason}")]
    InvalidCiphertext {
        /// Reason the value was rejected.
        reason: String,
    },

    /// Ciphertext names a key version that is not loaded.
    #[error("Unknown key version: v{version}")]
    UnknownKeyVersion {
        /// Version named by the ciphertext.
        version: u32,
    },

    /// Key derivation failed.
    #[error("Key derivation error: {reason}")]
    KeyDerivation {
        /// Reason for the failure.
        reason: String,
    },

    /// Key material or resolver configuration is unusable.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Reason for the failure.
        reason: String,
    },

    /// A collaborator lookup (user directory) failed.
    #[error("Lookup error: {reason}")]
    Lookup {
        /// Reason for the failure.
        reason: String,
    },
}

impl SecurityError {
    /// Creates a missing-tenant error.
    #[must_use]
    pub fn no_tenant_context(operation: impl Into<String>) -> Self {
        Self::NoTenantContext {
            operation: operation.into(),
        }
    }

    /// Creates a cross-tenant access error.
    #[must_use]
    pub fn tenant_access_denied(current: impl Into<String>, requested: impl Into<String>) -> Self {
        Self::TenantAccessDenied {
            current: current.into(),
            requested: requested.into(),
        }
    }

    /// Creates an ops-only error.
    #[must_use]
    pub fn ops_role_required(operation: impl Into<String>) -> Self {
        Self::OpsRoleRequired {
            operation: operation.into(),
        }
    }

    /// Creates an encryption error.
    #[must_use]
    pub fn encryption(reason: impl Into<String>) -> Self {
        Self::Encryption {
            reason: reason.into(),
        }
    }

    /// Creates an invalid ciphertext error.
    #[must_use]
    pub fn invalid_ciphertext(reason: impl Into<String>) -> Self {
        Self::InvalidCiphertext {
            reason: reason.into(),
        }
    }

    /// Creates a key derivation error.
    #[must_use]
    pub fn key_derivation(reason: impl Into<String>) -> Self {
        Self::KeyDerivation {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a lookup error.
    #[must_use]
    pub fn lookup(reason: impl Into<String>) -> Self {
        Self::Lookup {
            reason: reason.into(),
        }
    }

    /// Returns true for the missing-tenant condition.
    #[must_use]
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::NoTenantContext { .. })
    }

    /// Returns true if this is an access-control denial.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::TenantAccessDenied { .. } | Self::OpsRoleRequired { .. }
        )
    }

    /// Returns true if this is a cryptographic failure on stored data.
    #[must_use]
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::Encryption { .. }
                | Self::InvalidCiphertext { .. }
                | Self::UnknownKeyVersion { .. }
        )
    }
}

/// Result type for security operations.
pub type Result<T> = std::result::Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SecurityError::no_tenant_context("create").is_illegal_state());
        assert!(SecurityError::tenant_access_denied("a", "b").is_access_denied());
        assert!(SecurityError::ops_role_required("approve").is_access_denied());
        assert!(SecurityError::UnknownKeyVersion { version: 3 }.is_crypto_error());
        assert!(!SecurityError::configuration("x").is_crypto_error());
    }

    #[test]
    fn test_messages_name_the_precondition() {
        let err = SecurityError::tenant_access_denied("acme", "globex");
        let msg = err.to_string();
        assert!(msg.contains("acme") && msg.contains("globex"));
        assert_eq!(
            SecurityError::UnknownKeyVersion { version: 7 }.to_string(),
            "Unknown key version: v7"
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = SecurityError::ops_role_required("reject");
        let json = serde_json::to_string(&err).unwrap();
        let parsed: SecurityError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
