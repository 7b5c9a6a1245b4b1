//! Configuration traits.

use crate::error::ConfigError;

/// Trait for configuration types that can check their own consistency.
///
/// # Example
///
/// ```rust
/// use pgvault_core::config::Validatable;
/// use pgvault_core::error::ConfigError;
///
/// struct Retry {
///     attempts: u32,
/// }
///
/// impl Validatable for Retry {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.attempts == 0 {
///             return Err(ConfigError::invalid_value("attempts", "must be at least 1"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(Retry { attempts: 0 }.validate().is_err());
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}
