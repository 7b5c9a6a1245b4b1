//! # pgvault telemetry
//!
//! Logging setup for the pgvault binaries.
//!
//! - JSON or pretty output, to stdout or rolling files
//! - `RUST_LOG` takes precedence over the configured level
//! - Credential-shaped strings are redacted before a line reaches its sink

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Sensitive data masking
pub mod masking;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, LoggingError, init_logging};
    pub use crate::masking::{MaskingWriter, SensitiveDataMasker};
}
