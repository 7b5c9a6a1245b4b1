//! Settings and request validation, plus `PGVAULT_*` environment overrides.

use crate::error::ConfigError;
use std::fmt::Display;
use tracing::warn;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Collects failures while walking a settings tree.
///
/// Field names are qualified with the enclosing sections, so a bad timeout
/// under `connection_test` is reported as `connection_test.timeout_ms`.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    sections: Vec<String>,
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates an empty context at the root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `check` with `name` pushed onto the section path.
    pub fn section<R>(&mut self, name: impl Into<String>, check: impl FnOnce(&mut Self) -> R) -> R {
        self.sections.push(name.into());
        let out = check(self);
        self.sections.pop();
        out
    }

    /// Dotted path of the current section; empty at the root.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.sections.join(".")
    }

    /// Records a failure.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Failures so far, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// First failure, if any.
    pub fn into_result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    /// Missing-setting error for `field` in the current section.
    #[must_use]
    pub fn missing_field(&self, field: impl Into<String>) -> ConfigError {
        ConfigError::MissingField {
            field: field.into(),
            section: (!self.sections.is_empty()).then(|| self.current_path()),
        }
    }

    /// Invalid-value error for `field`, qualified with the current section.
    #[must_use]
    pub fn invalid_value(
        &self,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> ConfigError {
        let field = field.into();
        ConfigError::InvalidValue {
            field: self.qualify(&field),
            reason: reason.into(),
        }
    }

    fn qualify(&self, field: &str) -> String {
        if self.sections.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.current_path())
        }
    }
}

/// Chained field checks over a [`ValidationContext`].
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Borrows `ctx` for a run of checks.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    fn fail(&mut self, field: &str, reason: impl Into<String>) -> &mut Self {
        let error = self.ctx.invalid_value(field, reason);
        self.ctx.add_error(error);
        self
    }

    /// Blank strings count as missing.
    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            let error = self.ctx.missing_field(field);
            self.ctx.add_error(error);
        }
        self
    }

    /// Inclusive range check.
    pub fn in_range<T: PartialOrd + Display>(
        &mut self,
        field: &str,
        value: &T,
        min: &T,
        max: &T,
    ) -> &mut Self {
        if (min..=max).contains(&value) {
            self
        } else {
            self.fail(field, format!("{value} is outside {min}..={max}"))
        }
    }

    /// Fails with `message` unless `predicate` holds.
    pub fn custom<F>(&mut self, field: &str, predicate: F, message: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if predicate() { self } else { self.fail(field, message) }
    }

    /// When present, the value must be an absolute `http`/`https` URL with a host.
    pub fn valid_url(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        let Some(raw) = value else {
            return self;
        };
        match url::Url::parse(raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => self,
            Ok(parsed) => {
                let scheme = parsed.scheme();
                self.fail(field, format!("Scheme '{scheme}' is not http or https"))
            }
            Err(e) => self.fail(field, format!("Not an absolute URL: {e}")),
        }
    }
}

/// Environment variable overrides. Unset or blank variables leave the target
/// untouched; unparseable ones are logged and ignored.
///
/// ```rust
/// use pgvault_core::config::EnvOverride;
///
/// let mut port = 8080u16;
/// EnvOverride::apply_number("PGVAULT_DOC_UNSET_PORT", &mut port);
/// assert_eq!(port, 8080);
/// ```
pub struct EnvOverride;

impl EnvOverride {
    fn read(var_name: &str) -> Option<String> {
        std::env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Replaces a string.
    pub fn apply_string(var_name: &str, target: &mut String) {
        if let Some(value) = Self::read(var_name) {
            *target = value;
        }
    }

    /// Sets an optional string.
    pub fn apply_optional_string(var_name: &str, target: &mut Option<String>) {
        if let Some(value) = Self::read(var_name) {
            *target = Some(value);
        }
    }

    /// Replaces any `FromStr` value.
    pub fn apply_number<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        let Some(value) = Self::read(var_name) else {
            return;
        };
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(variable = var_name, value = %value, "Ignoring unparseable override"),
        }
    }

    /// Accepts `true/false`, `1/0`, `yes/no` and `on/off`.
    pub fn apply_bool(var_name: &str, target: &mut bool) {
        let Some(value) = Self::read(var_name) else {
            return;
        };
        match parse_flag(&value) {
            Some(flag) => *target = flag,
            None => warn!(variable = var_name, value = %value, "Ignoring unparseable override"),
        }
    }

    /// Replaces a list from comma-separated items; blank items are dropped.
    pub fn apply_list(var_name: &str, target: &mut Vec<String>) {
        if let Some(value) = Self::read(var_name) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["true", "1", "yes", "on"];
    const FALSE: [&str; 4] = ["false", "0", "no", "off"];
    if TRUE.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|f| value.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_qualify_and_unwind() {
        let mut ctx = ValidationContext::new();
        let err = ctx.section("encryption", |ctx| {
            ctx.section("v2", |ctx| ctx.invalid_value("key", "wrong length"))
        });
        assert_eq!(err.field(), Some("encryption.v2.key"));
        assert_eq!(ctx.current_path(), "");
        assert_eq!(
            ctx.missing_field("keys"),
            ConfigError::MissingField {
                field: "keys".to_string(),
                section: None,
            }
        );
    }

    #[test]
    fn test_validator_collects_errors() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx)
            .require_non_empty("host", " ")
            .in_range("port", &0u16, &1, &65535)
            .valid_url("base_url", Some("ftp://example.com"))
            .valid_url("other_url", Some("https://api.tosspayments.com"))
            .valid_url("relative_url", Some("/v1/payments"))
            .valid_url("missing_url", None);
        assert_eq!(ctx.errors().len(), 4);
        assert!(matches!(ctx.errors()[0], ConfigError::MissingField { .. }));
        assert!(ctx.into_result().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_env_override_unset_is_noop() {
        let mut value = vec!["www".to_string()];
        EnvOverride::apply_list("PGVAULT_TEST_SURELY_UNSET_LIST", &mut value);
        assert_eq!(value, vec!["www".to_string()]);
    }
}
