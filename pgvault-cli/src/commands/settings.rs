//! Configuration loading and logging setup shared by every command.

use anyhow::{Context, Result};
use pgvault_core::config::{ConfigLoader, LoggingSettings, PgVaultConfig, Validatable};
use pgvault_telemetry::logging::{LogConfig, LogFormat, RotationConfig, WorkerGuard, init_logging};
use std::path::Path;

/// Loads the configuration file, or defaults when none is given, then applies
/// `PGVAULT_*` overrides. Validation is left to the commands that need it.
pub fn load(path: Option<&Path>) -> Result<PgVaultConfig> {
    let mut config = match path {
        Some(path) => ConfigLoader::new()
            .load_file::<PgVaultConfig, _>(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PgVaultConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Fails when the configuration does not validate.
pub fn validate(config: &PgVaultConfig) -> Result<()> {
    config.validate().context("Invalid configuration")
}

/// Maps logging settings onto a telemetry configuration.
pub fn log_config(settings: &LoggingSettings, verbose: bool) -> Result<LogConfig> {
    let format: LogFormat = settings
        .format
        .parse()
        .map_err(anyhow::Error::msg)
        .context("Invalid logging.format")?;
    let level = if verbose { "debug" } else { settings.level.as_str() };

    let mut config = LogConfig::stdout(level, format);
    config.mask_sensitive = settings.mask_sensitive;
    if let Some(directory) = settings.directory.as_deref().filter(|d| !d.trim().is_empty()) {
        config = config.with_file(directory, RotationConfig::Daily);
    }
    Ok(config)
}

/// Installs the global subscriber. Keep the guards alive until exit.
pub fn setup_logging(settings: &LoggingSettings, verbose: bool) -> Result<Vec<WorkerGuard>> {
    let config = log_config(settings, verbose)?;
    init_logging(&config).context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgvault_telemetry::logging::LogOutput;
    use std::io::Write;

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = load(None).unwrap();
        assert!(config.encryption.keys.is_empty());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "encryption:\n  active_version: 1\n  keys:\n    - version: 1\n      key: {}\n\
             logging:\n  format: json",
            "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE="
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.encryption.keys.len(), 1);
        assert_eq!(config.logging.format, "json");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = load(Some(Path::new("/nonexistent/pgvault.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }

    #[test]
    fn test_log_config_mapping() {
        let settings = LoggingSettings {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            directory: Some("/var/log/pgvault".to_string()),
            mask_sensitive: false,
        };
        let config = log_config(&settings, false).unwrap();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.mask_sensitive);
        assert_eq!(config.outputs.len(), 2);
        assert!(matches!(
            &config.outputs[1],
            LogOutput::File { path, .. } if path == "/var/log/pgvault"
        ));

        assert_eq!(log_config(&settings, true).unwrap().level, "debug");
    }

    #[test]
    fn test_log_config_rejects_unknown_format() {
        let settings = LoggingSettings {
            format: "xml".to_string(),
            ..LoggingSettings::default()
        };
        assert!(log_config(&settings, false).is_err());
    }
}
