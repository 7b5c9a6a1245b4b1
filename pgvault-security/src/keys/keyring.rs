//! Versioned encryption keys.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;
use pgvault_core::config::{EncryptionSettings, KeySettings};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use zeroize::Zeroizing;

use super::crypto::{Argon2Params, Cipher, KEY_SIZE, derive_key, generate_key};
use crate::error::{Result, SecurityError};

struct Inner {
    ciphers: BTreeMap<u32, Arc<Cipher>>,
    active: u32,
}

/// Process-wide set of key versions with one marked active.
///
/// Reads take a shared lock; only [`insert`](Self::insert) and
/// [`set_active`](Self::set_active) take it exclusively.
pub struct KeyRing {
    inner: RwLock<Inner>,
}

impl KeyRing {
    /// Builds a ring from raw keys.
    pub fn new(active: u32, keys: impl IntoIterator<Item = (u32, [u8; KEY_SIZE])>) -> Result<Self> {
        let mut ciphers = BTreeMap::new();
        for (version, key) in keys {
            let key = Zeroizing::new(key);
            if ciphers.insert(version, Arc::new(Cipher::new(&key)?)).is_some() {
                return Err(SecurityError::configuration(format!(
                    "Duplicate key version v{version}"
                )));
            }
        }
        if !ciphers.contains_key(&active) {
            return Err(SecurityError::UnknownKeyVersion { version: active });
        }
        Ok(Self {
            inner: RwLock::new(Inner { ciphers, active }),
        })
    }

    /// Builds a ring from configuration, reading referenced environment variables.
    pub fn from_settings(settings: &EncryptionSettings) -> Result<Self> {
        Self::from_settings_with(settings, |name| std::env::var(name).ok())
    }

    /// Builds a ring from configuration with a custom variable lookup.
    pub fn from_settings_with<F>(settings: &EncryptionSettings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut keys = Vec::with_capacity(settings.keys.len());
        for entry in &settings.keys {
            keys.push((entry.version, *resolve_key(entry, &lookup)?));
        }
        let ring = Self::new(settings.active_version, keys)?;
        info!(
            active_version = settings.active_version,
            versions = ?ring.versions(),
            "Loaded encryption keys"
        );
        Ok(ring)
    }

    /// Version new ciphertexts are written with.
    #[must_use]
    pub fn active_version(&self) -> u32 {
        self.inner.read().active
    }

    /// Active version and its cipher.
    pub fn active(&self) -> Result<(u32, Arc<Cipher>)> {
        let inner = self.inner.read();
        let cipher = inner
            .ciphers
            .get(&inner.active)
            .cloned()
            .ok_or(SecurityError::UnknownKeyVersion {
                version: inner.active,
            })?;
        Ok((inner.active, cipher))
    }

    /// Cipher for a specific version.
    pub fn cipher(&self, version: u32) -> Result<Arc<Cipher>> {
        self.inner
            .read()
            .ciphers
            .get(&version)
            .cloned()
            .ok_or(SecurityError::UnknownKeyVersion { version })
    }

    /// Loaded versions, ascending.
    #[must_use]
    pub fn versions(&self) -> Vec<u32> {
        self.inner.read().ciphers.keys().copied().collect()
    }

    /// Adds a key version without activating it.
    pub fn insert(&self, version: u32, key: &[u8; KEY_SIZE]) -> Result<()> {
        let cipher = Arc::new(Cipher::new(key)?);
        let mut inner = self.inner.write();
        if inner.ciphers.contains_key(&version) {
            return Err(SecurityError::configuration(format!(
                "Key version v{version} already loaded"
            )));
        }
        inner.ciphers.insert(version, cipher);
        Ok(())
    }

    /// Marks a loaded version as active.
    pub fn set_active(&self, version: u32) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.ciphers.contains_key(&version) {
            return Err(SecurityError::UnknownKeyVersion { version });
        }
        let previous = std::mem::replace(&mut inner.active, version);
        info!(from = previous, to = version, "Active key version changed");
        Ok(())
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("KeyRing")
            .field("active", &inner.active)
            .field("versions", &inner.ciphers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Generates a new key, base64-encoded for configuration files.
pub fn generate_encoded_key() -> Result<String> {
    let key = Zeroizing::new(generate_key()?);
    Ok(STANDARD.encode(*key))
}

fn resolve_key<F>(entry: &KeySettings, lookup: &F) -> Result<Zeroizing<[u8; KEY_SIZE]>>
where
    F: Fn(&str) -> Option<String>,
{
    let version = entry.version;
    let from_env = |name: &String| {
        lookup(name).map(Zeroizing::new).ok_or_else(|| {
            SecurityError::configuration(format!(
                "Key v{version}: environment variable {name} is not set"
            ))
        })
    };

    if let Some(inline) = &entry.key {
        return decode_key(version, inline);
    }
    if let Some(name) = &entry.key_env {
        return decode_key(version, &from_env(name)?);
    }
    if let Some(name) = &entry.passphrase_env {
        let passphrase = from_env(name)?;
        let salt = entry.salt.as_deref().ok_or_else(|| {
            SecurityError::configuration(format!("Key v{version}: passphrase requires a salt"))
        })?;
        let salt = STANDARD
            .decode(salt.trim())
            .map_err(|e| SecurityError::configuration(format!("Key v{version}: bad salt: {e}")))?;
        let key = derive_key(passphrase.as_bytes(), &salt, Argon2Params::default())?;
        return Ok(Zeroizing::new(key));
    }
    Err(SecurityError::configuration(format!(
        "Key v{version}: no key source configured"
    )))
}

fn decode_key(version: u32, encoded: &str) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| SecurityError::configuration(format!("Key v{version}: bad base64: {e}")))?,
    );
    let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
        SecurityError::configuration(format!(
            "Key v{version}: expected {KEY_SIZE} bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(Zeroizing::new(key))
}
