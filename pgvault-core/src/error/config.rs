//! Settings load and validation failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A settings file that could not be read, parsed or accepted.
///
/// ```
/// use pgvault_core::error::ConfigError;
///
/// let error = ConfigError::invalid_value("encryption.active_version", "no such key");
/// assert_eq!(error.field(), Some("encryption.active_version"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error(
        "Setting '{field}' is required{}",
        section.as_deref().map(|s| format!(" in '{s}'")).unwrap_or_default()
    )]
    MissingField {
        /// Setting name.
        field: String,
        /// Dotted path of the enclosing section.
        section: Option<String>,
    },

    /// A setting is present but unusable.
    #[error("Setting '{field}' is invalid: {reason}")]
    InvalidValue {
        /// Dotted setting path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Settings file could not be opened.
    #[error("Cannot read settings file '{path}': {reason}")]
    FileReadError {
        /// File that was opened.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// Unknown extension, or YAML/TOML/JSON that does not fit the schema.
    #[error("Settings file '{path}' is malformed: {reason}")]
    InvalidFormat {
        /// File, or a placeholder for in-memory input.
        path: String,
        /// Parser message.
        reason: String,
    },
}

impl ConfigError {
    /// Top-level missing setting.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            section: None,
        }
    }

    /// Unusable setting value.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Setting the error is about, when it names one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field, .. } | Self::InvalidValue { field, .. } => Some(field),
            Self::FileReadError { .. } | Self::InvalidFormat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        assert_eq!(
            ConfigError::missing_field("keys").to_string(),
            "Setting 'keys' is required"
        );
        let nested = ConfigError::MissingField {
            field: "key".to_string(),
            section: Some("encryption.keys[0]".to_string()),
        };
        assert_eq!(
            nested.to_string(),
            "Setting 'key' is required in 'encryption.keys[0]'"
        );
    }

    #[test]
    fn test_field_only_for_setting_errors() {
        assert_eq!(ConfigError::invalid_value("port", "0").field(), Some("port"));
        let unreadable = ConfigError::FileReadError {
            path: "pgvault.yaml".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(unreadable.field(), None);
        assert!(unreadable.to_string().contains("pgvault.yaml"));
    }
}
