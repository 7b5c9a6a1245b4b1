//! Logging settings as consumed by [`init_logging`](super::init_logging).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where and how log lines are written.
///
/// Every field has a default, so `{}` is a valid document: JSON to stdout at
/// `info` with credential masking on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Line encoding.
    pub format: LogFormat,
    /// Sinks; at least one.
    pub outputs: Vec<LogOutput>,
    /// Extra per-line metadata.
    pub detail: LogDetail,
    /// Pass every formatted line through the credential masker.
    pub mask_sensitive: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            outputs: vec![LogOutput::Stdout],
            detail: LogDetail::default(),
            mask_sensitive: true,
        }
    }
}

impl LogConfig {
    /// Stdout only, at `level`.
    #[must_use]
    pub fn stdout(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
            ..Self::default()
        }
    }

    /// Also writes rotated files under `directory`.
    #[must_use]
    pub fn with_file(mut self, directory: impl Into<String>, rotation: RotationConfig) -> Self {
        self.outputs.push(LogOutput::File {
            path: directory.into(),
            rotation,
        });
        self
    }
}

/// Optional metadata attached to each line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogDetail {
    /// Thread id of the emitting thread.
    pub thread_ids: bool,
    /// Source file and line of the callsite.
    pub source_location: bool,
    /// Emit span enter and exit events.
    pub span_events: bool,
}

/// Line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One flattened JSON object per event.
    #[default]
    Json,
    /// Human-readable, coloured on terminals.
    #[serde(alias = "text")]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if wanted.eq_ignore_ascii_case("pretty") || wanted.eq_ignore_ascii_case("text") {
            Ok(Self::Pretty)
        } else {
            Err(format!("unknown log format '{wanted}', expected json or pretty"))
        }
    }
}

/// A log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Process stdout.
    Stdout,
    /// Rolling files named `pgvault.log[.<period>]` in `path`.
    File {
        /// Directory, created on startup.
        path: String,
        /// Roll-over period.
        #[serde(default)]
        rotation: RotationConfig,
    },
}

/// How often file outputs roll over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationConfig {
    /// New file every hour.
    Hourly,
    /// New file every day.
    #[default]
    Daily,
    /// Single ever-growing file.
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let parsed: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, LogConfig::default());
        assert!(parsed.mask_sensitive);
        assert_eq!(parsed.outputs, vec![LogOutput::Stdout]);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" text ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("xml"));
    }

    #[test]
    fn test_file_output_rotation_defaults_to_daily() {
        let parsed: LogConfig = serde_json::from_str(
            r#"{"format":"text","outputs":[{"type":"file","path":"/var/log/pgvault"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.format, LogFormat::Pretty);
        assert_eq!(
            parsed.outputs,
            vec![LogOutput::File {
                path: "/var/log/pgvault".to_string(),
                rotation: RotationConfig::Daily,
            }]
        );
    }

    #[test]
    fn test_with_file_keeps_stdout() {
        let config = LogConfig::stdout("debug", LogFormat::Pretty)
            .with_file("/tmp/pgvault", RotationConfig::Hourly);
        assert_eq!(config.level, "debug");
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.outputs[0], LogOutput::Stdout);
    }
}
