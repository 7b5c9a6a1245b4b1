//! Service error taxonomy.

use pgvault_core::error::{ConfigError, StorageError};
use pgvault_core::types::PgProvider;
use pgvault_security::error::SecurityError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a write conflicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Another configuration is already `ACTIVE` for the tenant and provider.
    AlreadyActive,
    /// The state machine forbids the transition from the current state.
    InvalidTransition,
    /// The row changed since it was read; reload and retry.
    StaleVersion,
}

/// Errors returned by configuration services.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceError {
    /// A tenant is required but none was resolved.
    #[error("Illegal state: {reason}")]
    IllegalState {
        /// Missing precondition.
        reason: String,
    },

    /// Tenant isolation or role check refused the caller.
    #[error("Access denied: {reason}")]
    AccessDenied {
        /// Refusal detail.
        reason: String,
    },

    /// Referenced row does not exist or is soft-deleted.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource kind.
        resource: String,
        /// Identifier looked up.
        id: String,
    },

    /// Write rejected by a uniqueness, transition or version check.
    #[error("Conflict: {reason}")]
    Conflict {
        /// Conflict class.
        kind: ConflictKind,
        /// Failed precondition.
        reason: String,
    },

    /// Request field failed validation.
    #[error("Validation failed for '{field}': {reason}")]
    Validation {
        /// Offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No connection tester is registered for the provider.
    #[error("No connection tester registered for provider {provider}")]
    UnsupportedProvider {
        /// Provider without a tester.
        provider: PgProvider,
    },

    /// Stored credential could not be encrypted or decrypted.
    #[error("Credential encryption error: {reason}")]
    Crypto {
        /// Failure detail.
        reason: String,
    },

    /// Persistence layer failure.
    #[error("Storage error: {reason}")]
    Storage {
        /// Failure detail.
        reason: String,
    },

    /// Service wiring is unusable (key material, HTTP client).
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Failure detail.
        reason: String,
    },
}

impl ServiceError {
    /// Creates a not-found error for a configuration id.
    #[must_use]
    pub fn configuration_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "PG configuration".to_string(),
            id: id.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(kind: ConflictKind, reason: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates an invalid-transition conflict.
    #[must_use]
    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::conflict(ConflictKind::InvalidTransition, reason)
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
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

    /// Only lost optimistic-concurrency races are worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict {
                kind: ConflictKind::StaleVersion,
                ..
            }
        )
    }

    /// Returns true for isolation and role refusals.
    #[must_use]
    pub fn is_access_error(&self) -> bool {
        matches!(self, Self::AccessDenied { .. } | Self::IllegalState { .. })
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IllegalState { .. } => "ILLEGAL_STATE",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::UnsupportedProvider { .. } => "UNSUPPORTED_PROVIDER",
            Self::Crypto { .. } => "CRYPTO_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }
}

impl From<SecurityError> for ServiceError {
    fn from(err: SecurityError) -> Self {
        if err.is_illegal_state() {
            Self::IllegalState {
                reason: err.to_string(),
            }
        } else if err.is_access_denied() {
            Self::AccessDenied {
                reason: err.to_string(),
            }
        } else if matches!(
            err,
            SecurityError::Configuration { .. } | SecurityError::Lookup { .. }
        ) {
            Self::Configuration {
                reason: err.to_string(),
            }
        } else {
            Self::Crypto {
                reason: err.to_string(),
            }
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionConflict { .. } => Self::conflict(
                ConflictKind::StaleVersion,
                format!("{err}; reload and retry"),
            ),
            StorageError::UniqueViolation { detail, .. } => {
                Self::conflict(ConflictKind::AlreadyActive, detail)
            }
            StorageError::NotFound { id } => Self::configuration_not_found(id),
            other => Self::Storage {
                reason: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingField { field, .. } => Self::validation(field, "is required"),
            ConfigError::InvalidValue { field, reason } => Self::validation(field, reason),
            other => Self::configuration(other.to_string()),
        }
    }
}

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_is_retryable_conflict() {
        let err: ServiceError = StorageError::version_conflict("cfg-1", 3, 4).into();
        assert!(matches!(
            err,
            ServiceError::Conflict {
                kind: ConflictKind::StaleVersion,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unique_violation_names_the_clash() {
        let err: ServiceError = StorageError::UniqueViolation {
            constraint: "uq".to_string(),
            detail: "configuration x is already ACTIVE".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("already ACTIVE"));
    }

    #[test]
    fn test_security_mapping() {
        let err: ServiceError = SecurityError::no_tenant_context("create").into();
        assert_eq!(err.code(), "ILLEGAL_STATE");
        let err: ServiceError = SecurityError::tenant_access_denied("a", "b").into();
        assert_eq!(err.code(), "ACCESS_DENIED");
        assert!(err.is_access_error());
        let err: ServiceError = SecurityError::invalid_ciphertext("bad").into();
        assert_eq!(err.code(), "CRYPTO_ERROR");
    }
}
