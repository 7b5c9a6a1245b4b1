//! Structured logging for pgvault.
//!
//! Provides configurable logging with support for:
//! - JSON and pretty-print formats
//! - Multiple output targets (stdout, file)
//! - Log rotation
//! - Credential masking on every output

mod config;

pub use config::{LogConfig, LogDetail, LogFormat, LogOutput, RotationConfig};
pub use tracing_appender::non_blocking::WorkerGuard;

use crate::masking::{MaskingWriter, SensitiveDataMasker};
use std::sync::Arc;
use tracing::Subscriber;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter, format::FmtSpan},
    Registry,
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// File name prefix used by file outputs.
pub const LOG_FILE_PREFIX: &str = "pgvault.log";

/// A type-erased layer over subscriber `S`.
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Initialize the global subscriber with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the program
/// so buffered file output is flushed.
///
/// ```no_run
/// use pgvault_telemetry::logging::{init_logging, LogConfig};
///
/// let config = LogConfig::default();
/// let _guards = init_logging(&config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::InvalidConfig(format!("level '{}': {e}", config.level)))?;

    let (layers, guards) = build_layers::<Layered<EnvFilter, Registry>>(config)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

/// Builds one layer per configured output without installing anything.
pub fn build_layers<S>(
    config: &LogConfig,
) -> Result<(Vec<BoxedLayer<S>>, Vec<WorkerGuard>), LoggingError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    if config.outputs.is_empty() {
        return Err(LoggingError::InvalidConfig(
            "at least one output is required".to_string(),
        ));
    }

    let masker = Arc::new(SensitiveDataMasker::new());
    let mut layers = Vec::with_capacity(config.outputs.len());
    let mut guards = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => {
                layers.push(output_layer(config, std::io::stdout, true, &masker));
            }
            LogOutput::File { path, rotation } => {
                std::fs::create_dir_all(path)?;
                let appender = match rotation {
                    RotationConfig::Hourly => rolling::hourly(path, LOG_FILE_PREFIX),
                    RotationConfig::Daily => rolling::daily(path, LOG_FILE_PREFIX),
                    RotationConfig::Never => rolling::never(path, LOG_FILE_PREFIX),
                };
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                layers.push(output_layer(config, non_blocking, false, &masker));
                guards.push(guard);
            }
        }
    }

    Ok((layers, guards))
}

fn output_layer<S, W>(
    config: &LogConfig,
    writer: W,
    ansi: bool,
    masker: &Arc<SensitiveDataMasker>,
) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if config.mask_sensitive {
        format_layer(config, MaskingWriter::new(writer, Arc::clone(masker)), ansi)
    } else {
        format_layer(config, writer, ansi)
    }
}

fn format_layer<S, W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(config.detail.thread_ids)
        .with_file(config.detail.source_location)
        .with_line_number(config.detail.source_location)
        .with_span_events(if config.detail.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        });

    match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.with_ansi(ansi).boxed(),
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_output_is_masked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs");
        let config = LogConfig {
            outputs: vec![LogOutput::File {
                path: path.to_string_lossy().into_owned(),
                rotation: RotationConfig::Never,
            }],
            ..LogConfig::default()
        };

        let (layers, guards) = build_layers::<Registry>(&config).unwrap();
        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(tenant_id = "acme", "stored api_key=AKIA1234567890ABCDEF");
        });
        drop(guards);

        let written = std::fs::read_to_string(path.join(LOG_FILE_PREFIX)).unwrap();
        assert!(written.contains("\"tenant_id\":\"acme\""));
        assert!(written.contains("api_key=AKI***DEF"));
        assert!(!written.contains("AKIA1234567890ABCDEF"));
    }

    #[test]
    fn test_unmasked_output_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            format: LogFormat::Pretty,
            mask_sensitive: false,
            outputs: vec![LogOutput::File {
                path: dir.path().to_string_lossy().into_owned(),
                rotation: RotationConfig::Never,
            }],
            ..LogConfig::default()
        };

        let (layers, guards) = build_layers::<Registry>(&config).unwrap();
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layers), || {
            tracing::warn!("api_key=AKIA1234567890ABCDEF");
        });
        drop(guards);

        let written = std::fs::read_to_string(dir.path().join(LOG_FILE_PREFIX)).unwrap();
        assert!(written.contains("AKIA1234567890ABCDEF"));
    }

    #[test]
    fn test_no_outputs_rejected() {
        let config = LogConfig {
            outputs: Vec::new(),
            ..LogConfig::default()
        };
        let result = build_layers::<Registry>(&config);
        assert!(matches!(result, Err(LoggingError::InvalidConfig(_))));
    }
}
