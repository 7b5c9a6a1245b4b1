//! Version-tagged credential encryption.
//!
//! Stored form is `v<version>::<base64(nonce || ciphertext || tag)>`. The tag
//! is also the AEAD associated data, so a payload cannot be relabelled to a
//! different key version.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tracing::debug;

use super::crypto::{NONCE_SIZE, TAG_SIZE};
use super::keyring::KeyRing;
use super::secret::Secret;
use crate::error::{Result, SecurityError};

const SEPARATOR: &str = "::";

/// Encrypts and decrypts credential strings against a [`KeyRing`].
#[derive(Debug, Clone)]
pub struct CredentialCipher {
    keys: Arc<KeyRing>,
}

impl CredentialCipher {
    /// Creates a cipher over a shared key ring.
    #[must_use]
    pub fn new(keys: Arc<KeyRing>) -> Self {
        Self { keys }
    }

    /// The underlying key ring.
    #[must_use]
    pub fn key_ring(&self) -> &Arc<KeyRing> {
        &self.keys
    }

    /// Encrypts with the active key version.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let (version, cipher) = self.keys.active()?;
        let tag = version_tag(version);
        let sealed = cipher.encrypt(plaintext.as_bytes(), tag.as_bytes())?;
        Ok(format!("{tag}{SEPARATOR}{}", STANDARD.encode(sealed)))
    }

    /// Decrypts a stored value with the key version it names.
    pub fn decrypt(&self, stored: &str) -> Result<Secret> {
        let (version, payload) = split(stored)?;
        let sealed = STANDARD
            .decode(payload)
            .map_err(|e| SecurityError::invalid_ciphertext(format!("payload is not base64: {e}")))?;
        let plain = self
            .keys
            .cipher(version)?
            .decrypt(&sealed, version_tag(version).as_bytes())?;
        Secret::from_utf8(plain)
            .ok_or_else(|| SecurityError::invalid_ciphertext("plaintext is not UTF-8"))
    }

    /// Returns whether `value` has the stored ciphertext shape.
    ///
    /// Shape only: the key version need not be loaded and the payload is not
    /// authenticated.
    #[must_use]
    pub fn is_encrypted(value: &str) -> bool {
        split(value).is_ok_and(|(_, payload)| {
            STANDARD
                .decode(payload)
                .is_ok_and(|bytes| bytes.len() >= NONCE_SIZE + TAG_SIZE)
        })
    }

    /// Key version named by a stored value.
    #[must_use]
    pub fn key_version_of(value: &str) -> Option<u32> {
        split(value).ok().map(|(version, _)| version)
    }

    /// Returns `value` as ciphertext under the active key.
    ///
    /// Values already on the active version are returned unchanged, values on
    /// an older version are re-encrypted, and plaintext is encrypted.
    pub fn ensure_active_key(&self, value: &str) -> Result<String> {
        let active = self.keys.active_version();
        if !Self::is_encrypted(value) {
            return self.encrypt(value);
        }
        match Self::key_version_of(value) {
            Some(version) if version == active => Ok(value.to_string()),
            Some(version) => {
                debug!(from = version, to = active, "Re-encrypting credential");
                let plain = self.decrypt(value)?;
                self.encrypt(plain.expose())
            }
            None => self.encrypt(value),
        }
    }
}

fn version_tag(version: u32) -> String {
    format!("v{version}")
}

fn split(stored: &str) -> Result<(u32, &str)> {
    let (tag, payload) = stored
        .split_once(SEPARATOR)
        .ok_or_else(|| SecurityError::invalid_ciphertext("missing key version tag"))?;
    let version = tag
        .strip_prefix('v')
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| SecurityError::invalid_ciphertext(format!("bad key version tag '{tag}'")))?;
    Ok((version, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::crypto::KEY_SIZE;

    fn cipher(active: u32) -> CredentialCipher {
        let ring = KeyRing::new(active, [(1, [1u8; KEY_SIZE]), (2, [2u8; KEY_SIZE])]).unwrap();
        CredentialCipher::new(Arc::new(ring))
    }

    #[test]
    fn test_encrypt_tags_active_version() {
        let c = cipher(1);
        let stored = c.encrypt("test_sk_abc").unwrap();
        assert!(stored.starts_with("v1::"));
        assert!(!stored.contains("test_sk_abc"));
        assert_eq!(c.decrypt(&stored).unwrap().expose(), "test_sk_abc");
    }

    #[test]
    fn test_old_version_still_decrypts_after_activation_change() {
        let c = cipher(1);
        let stored = c.encrypt("secret").unwrap();
        c.key_ring().set_active(2).unwrap();
        assert_eq!(c.decrypt(&stored).unwrap().expose(), "secret");
        assert!(c.encrypt("secret").unwrap().starts_with("v2::"));
    }

    #[test]
    fn test_relabelled_payload_fails_authentication() {
        let c = cipher(1);
        let stored = c.encrypt("secret").unwrap();
        let relabelled = stored.replacen("v1::", "v2::", 1);
        assert!(c.decrypt(&relabelled).is_err());
    }

    #[test]
    fn test_is_encrypted() {
        let c = cipher(1);
        assert!(CredentialCipher::is_encrypted(&c.encrypt("x").unwrap()));
        assert!(!CredentialCipher::is_encrypted("plain-api-key"));
        assert!(!CredentialCipher::is_encrypted("v1::not base64!"));
        assert!(!CredentialCipher::is_encrypted("vx::AAAA"));
        assert!(!CredentialCipher::is_encrypted("v1::AAAA"));
    }

    #[test]
    fn test_ensure_active_key() {
        let c = cipher(1);
        let v1 = c.encrypt("secret").unwrap();
        assert_eq!(c.ensure_active_key(&v1).unwrap(), v1);

        c.key_ring().set_active(2).unwrap();
        let v2 = c.ensure_active_key(&v1).unwrap();
        assert_eq!(CredentialCipher::key_version_of(&v2), Some(2));
        assert_eq!(c.decrypt(&v2).unwrap().expose(), "secret");
        assert_eq!(c.ensure_active_key(&v2).unwrap(), v2);

        let from_plain = c.ensure_active_key("legacy-plaintext").unwrap();
        assert_eq!(c.decrypt(&from_plain).unwrap().expose(), "legacy-plaintext");
    }

    #[test]
    fn test_unknown_version_and_garbage() {
        let c = cipher(1);
        let other = KeyRing::new(9, [(9, [9u8; KEY_SIZE])]).unwrap();
        let foreign = CredentialCipher::new(Arc::new(other)).encrypt("x").unwrap();
        assert_eq!(
            c.decrypt(&foreign).unwrap_err(),
            SecurityError::UnknownKeyVersion { version: 9 }
        );
        assert!(matches!(
            c.decrypt("garbage").unwrap_err(),
            SecurityError::InvalidCiphertext { .. }
        ));
    }
}
