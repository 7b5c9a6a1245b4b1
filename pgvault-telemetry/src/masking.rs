//! Sensitive data masking for logs.
//!
//! Provider credentials travel through request bodies, headers and error
//! messages. [`SensitiveDataMasker`] finds credential-shaped substrings and
//! [`MaskingWriter`] applies it to every formatted line before the sink sees it.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock};
use tracing_subscriber::fmt::MakeWriter;

/// Patterns for detecting sensitive data.
static PATTERNS: LazyLock<Vec<SensitivePattern>> = LazyLock::new(|| {
    vec![
        // Generic key assignments, including Iamport's imp_key
        SensitivePattern::new(
            "api_key",
            r#"(?i)(api[_-]?key|apikey|imp[_-]?key)["'\s:=]+["']?([A-Za-z0-9_\-]{8,})"#,
            2,
        ),
        SensitivePattern::new(
            "secret_key",
            r#"(?i)(secret[_-]?key|secretkey|api[_-]?secret|imp[_-]?secret|client[_-]?secret)["'\s:=]+["']?([A-Za-z0-9_\-]{8,})"#,
            2,
        ),
        SensitivePattern::new(
            "password",
            r#"(?i)(password|passwd|passphrase)["'\s:=]+["']?([^\s"',}]{4,})"#,
            2,
        ),
        // Stripe secret and restricted keys
        SensitivePattern::new("stripe_key", r"\b[sr]k_(?:live|test)_[A-Za-z0-9]{8,}", 0),
        // Toss Payments secret and client keys
        SensitivePattern::new("toss_key", r"\b(?:live|test)_(?:g?sk|ck)_[A-Za-z0-9]{8,}", 0),
        SensitivePattern::new("bearer_token", r"(?i)bearer\s+([A-Za-z0-9._~+/\-]{16,}=*)", 1),
        SensitivePattern::new("basic_auth", r"(?i)basic\s+([A-Za-z0-9+/]{8,}=*)", 1),
    ]
});

struct SensitivePattern {
    #[allow(dead_code)]
    name: &'static str,
    regex: Regex,
    group: usize,
}

impl SensitivePattern {
    fn new(name: &'static str, pattern: &str, group: usize) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("static masking pattern"),
            group,
        }
    }
}

/// Masks sensitive data in strings.
#[derive(Debug, Clone)]
pub struct SensitiveDataMasker {
    /// Values shorter than this are masked entirely
    min_length: usize,
    /// Characters to show at start of masked value
    show_start: usize,
    /// Characters to show at end of masked value
    show_end: usize,
    /// Mask character
    mask_char: char,
}

impl Default for SensitiveDataMasker {
    fn default() -> Self {
        Self::new()
    }
}

impl SensitiveDataMasker {
    /// Create a new masker with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(8, 3, 3)
    }

    /// Create a masker with custom settings.
    #[must_use]
    pub fn with_settings(min_length: usize, show_start: usize, show_end: usize) -> Self {
        Self {
            min_length,
            show_start,
            show_end,
            mask_char: '*',
        }
    }

    /// Mask a known sensitive value.
    ///
    /// ```
    /// use pgvault_telemetry::masking::SensitiveDataMasker;
    ///
    /// let masker = SensitiveDataMasker::new();
    /// assert_eq!(masker.mask_value("test_sk_zXLkKEypNArWmo50"), "tes***o50");
    /// assert_eq!(masker.mask_value("short"), "*****");
    /// ```
    #[must_use]
    pub fn mask_value(&self, value: &str) -> String {
        let chars: Vec<char> = value.chars().collect();
        let mask = self.mask_char.to_string().repeat(3);
        if chars.len() < self.min_length || chars.len() <= self.show_start + self.show_end {
            return self.mask_char.to_string().repeat(chars.len().max(3));
        }

        let start: String = chars[..self.show_start].iter().collect();
        let end: String = chars[chars.len() - self.show_end..].iter().collect();
        format!("{start}{mask}{end}")
    }

    /// Mask every sensitive match in a string.
    ///
    /// Borrows the input when nothing matched.
    #[must_use]
    pub fn mask_string<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(input);

        for pattern in PATTERNS.iter() {
            if !pattern.regex.is_match(&result) {
                continue;
            }
            let replaced = pattern
                .regex
                .replace_all(&result, |caps: &Captures<'_>| self.mask_capture(caps, pattern.group))
                .into_owned();
            result = Cow::Owned(replaced);
        }

        result
    }

    fn mask_capture(&self, caps: &Captures<'_>, group: usize) -> String {
        let whole = &caps[0];
        let Some(secret) = caps.get(group) else {
            return whole.to_string();
        };
        let offset = caps.get(0).map_or(0, |m| m.start());
        let (head, tail) = (secret.start() - offset, secret.end() - offset);
        format!(
            "{}{}{}",
            &whole[..head],
            self.mask_value(secret.as_str()),
            &whole[tail..]
        )
    }

    /// Check if a string contains sensitive patterns.
    #[must_use]
    pub fn contains_sensitive(&self, input: &str) -> bool {
        PATTERNS.iter().any(|p| p.regex.is_match(input))
    }
}

/// A [`MakeWriter`] that masks each formatted line before forwarding it.
#[derive(Debug, Clone)]
pub struct MaskingWriter<M> {
    inner: M,
    masker: Arc<SensitiveDataMasker>,
}

impl<M> MaskingWriter<M> {
    /// Wraps `inner` with the given masker.
    pub fn new(inner: M, masker: Arc<SensitiveDataMasker>) -> Self {
        Self { inner, masker }
    }
}

impl<'a, M> MakeWriter<'a> for MaskingWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = MaskedLine<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskedLine::new(self.inner.make_writer(), &self.masker)
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaskedLine::new(self.inner.make_writer_for(meta), &self.masker)
    }
}

/// Buffers one formatted event and writes it masked on flush or drop.
pub struct MaskedLine<'a, W: Write> {
    inner: W,
    masker: &'a SensitiveDataMasker,
    buf: Vec<u8>,
}

impl<'a, W: Write> MaskedLine<'a, W> {
    fn new(inner: W, masker: &'a SensitiveDataMasker) -> Self {
        Self {
            inner,
            masker,
            buf: Vec::new(),
        }
    }

    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&self.buf);
        let masked = self.masker.mask_string(&line);
        self.inner.write_all(masked.as_bytes())?;
        self.buf.clear();
        self.inner.flush()
    }
}

impl<W: Write> Write for MaskedLine<'_, W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()
    }
}

impl<W: Write> Drop for MaskedLine<'_, W> {
    fn drop(&mut self) {
        let _ = self.emit();
    }
}
