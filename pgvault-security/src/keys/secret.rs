//! Plaintext credential holders.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A decrypted credential. Zeroed on drop, redacted in `Debug`/`Display`.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    value: String,
}

impl Secret {
    /// Wraps a plaintext value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Wraps decrypted bytes, rejecting non-UTF-8 data.
    pub fn from_utf8(mut bytes: Vec<u8>) -> Option<Self> {
        let value = match String::from_utf8(std::mem::take(&mut bytes)) {
            Ok(value) => value,
            Err(e) => {
                let mut raw = e.into_bytes();
                raw.zeroize();
                return None;
            }
        };
        Some(Self { value })
    }

    /// Exposes the plaintext. Do not log or persist the result.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// True if empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Returns a display-safe form.
    #[must_use]
    pub fn masked(&self) -> MaskedSecret {
        MaskedSecret::of(&self.value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED, {} bytes])", self.value.len())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.value.as_bytes(), other.value.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl Eq for Secret {}

/// Masked credential for display: everything but the last four characters
/// is replaced, and values of eight characters or fewer are fully hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedSecret(String);

impl MaskedSecret {
    /// Masks a plaintext value.
    #[must_use]
    pub fn of(value: &str) -> Self {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= 8 {
            return Self("****".to_string());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        Self(format!("****{tail}"))
    }

    /// The masked text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaskedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_formatting() {
        let secret = Secret::new("sk_live_abcdef123456");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert!(!format!("{secret:?}").contains("abcdef"));
    }

    #[test]
    fn test_masking() {
        assert_eq!(Secret::new("sk_live_abcdef123456").masked().as_str(), "****3456");
        assert_eq!(MaskedSecret::of("short").as_str(), "****");
        assert_eq!(MaskedSecret::of("").as_str(), "****");
    }

    #[test]
    fn test_from_utf8() {
        assert_eq!(Secret::from_utf8(b"abc".to_vec()).unwrap().expose(), "abc");
        assert!(Secret::from_utf8(vec![0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_blank_and_equality() {
        assert!(Secret::new("  ").is_blank());
        assert_eq!(Secret::new("a"), Secret::new("a"));
        assert_ne!(Secret::new("a"), Secret::new("b"));
    }
}
