//! Storage-related error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persistence errors raised by configuration and history repositories.
///
/// # Examples
///
/// ```
/// use pgvault_core::error::StorageError;
///
/// let error = StorageError::version_conflict("cfg-1", 3, 4);
/// assert!(error.is_version_conflict());
/// assert!(error.to_string().contains("cfg-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    /// Compare-and-swap write targeted a stale version.
    #[error("[Storage] Version conflict on '{id}': expected {expected}, found {actual}")]
    VersionConflict {
        /// Record identifier.
        id: String,
        /// Version the writer expected.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// A uniqueness constraint would be violated by the write.
    #[error("[Storage] Unique constraint '{constraint}' violated: {detail}")]
    UniqueViolation {
        /// Name of the constraint.
        constraint: String,
        /// Description of the conflicting row.
        detail: String,
    },

    /// Record not found.
    #[error("[Storage] Not found: {id}")]
    NotFound {
        /// Record identifier.
        id: String,
    },

    /// Record already exists.
    #[error("[Storage] Already exists: {id}")]
    AlreadyExists {
        /// Record identifier.
        id: String,
    },

    /// I/O operation failed.
    #[error("[Storage] I/O error during {operation} on '{path}': {reason}")]
    IoError {
        /// Operation that failed (read, write, rename).
        operation: String,
        /// Path to the file.
        path: String,
        /// Reason for the I/O error.
        reason: String,
    },

    /// Serialization or deserialization failed.
    #[error("[Storage] Serialization error: {reason}")]
    SerializationError {
        /// Reason for the failure.
        reason: String,
    },
}

impl StorageError {
    /// Creates a version conflict error.
    #[must_use]
    pub fn version_conflict(id: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::VersionConflict {
            id: id.into(),
            expected,
            actual,
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IoError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::SerializationError {
            reason: reason.into(),
        }
    }

    /// Returns true if this is an optimistic-concurrency failure.
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Returns true if reloading and retrying the write may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_version_conflict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_is_retryable() {
        let error = StorageError::version_conflict("cfg", 1, 2);
        assert!(error.is_retryable());
        assert!(error.to_string().contains("expected 1"));
    }

    #[test]
    fn test_io_error_not_retryable() {
        let error = StorageError::io("write", "/var/lib/pgvault/store.json", "disk full");
        assert!(!error.is_retryable());
        assert!(!error.is_version_conflict());
    }
}
