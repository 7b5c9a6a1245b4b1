//! AES-256-GCM and Argon2id primitives.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, SecurityError};

/// AES-256-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-256-GCM tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Recommended salt size for passphrase derivation.
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Derives a 256-bit key from a passphrase with Argon2id.
pub fn derive_key(passphrase: &[u8], salt: &[u8], params: Argon2Params) -> Result<[u8; KEY_SIZE]> {
    use argon2::{Algorithm, Argon2, Params, Version};

    let argon_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| SecurityError::key_derivation(format!("Invalid Argon2 params: {e}")))?;

    let mut key = [0u8; KEY_SIZE];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| SecurityError::key_derivation(format!("Argon2id failed: {e}")))?;
    Ok(key)
}

/// Fills a fixed-size buffer from the system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| SecurityError::encryption("System RNG unavailable"))?;
    Ok(buf)
}

/// Generates a fresh AES-256 key.
pub fn generate_key() -> Result<[u8; KEY_SIZE]> {
    random_bytes::<KEY_SIZE>()
}

/// Generates a fresh derivation salt.
pub fn generate_salt() -> Result<[u8; SALT_SIZE]> {
    random_bytes::<SALT_SIZE>()
}

/// AES-256-GCM cipher bound to one key.
///
/// Output layout is `nonce || ciphertext || tag` with a random nonce per call.
/// The raw key bytes are not retained after construction.
pub struct Cipher {
    key: LessSafeKey,
}

impl Cipher {
    /// Creates a cipher from raw key bytes.
    pub fn new(key: &[u8; KEY_SIZE]) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| SecurityError::encryption("Rejected AES-256 key"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
        })
    }

    /// Creates a cipher from a passphrase via Argon2id.
    pub fn from_passphrase(passphrase: &[u8], salt: &[u8], params: Argon2Params) -> Result<Self> {
        let mut key = derive_key(passphrase, salt, params)?;
        let cipher = Self::new(&key);
        zeroize::Zeroize::zeroize(&mut key);
        cipher
    }

    /// Encrypts `plaintext`, authenticating `aad` alongside it.
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes = random_bytes::<NONCE_SIZE>()?;

        let mut sealed = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad),
                &mut sealed,
            )
            .map_err(|_| SecurityError::encryption("Seal failed"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.append(&mut sealed);
        Ok(out)
    }

    /// Decrypts a `nonce || ciphertext || tag` buffer.
    pub fn decrypt(&self, data: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecurityError::invalid_ciphertext("payload too short"));
        }
        let (nonce_bytes, sealed) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| SecurityError::invalid_ciphertext("bad nonce"))?;

        let mut buf = sealed.to_vec();
        let plain = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut buf)
            .map_err(|_| SecurityError::encryption("Authentication failed"))?;
        Ok(plain.to_vec())
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher(AES-256-GCM)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: Argon2Params = Argon2Params {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    };

    #[test]
    fn test_derivation_is_deterministic_per_salt() {
        let salt = generate_salt().unwrap();
        let a = derive_key(b"hunter2", &salt, FAST).unwrap();
        let b = derive_key(b"hunter2", &salt, FAST).unwrap();
        assert_eq!(a, b);

        let other = derive_key(b"hunter2", &generate_salt().unwrap(), FAST).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_seal_and_open() {
        let cipher = Cipher::new(&[7u8; KEY_SIZE]).unwrap();
        let sealed = cipher.encrypt(b"sk_live_123", b"v1").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 11 + TAG_SIZE);
        assert_eq!(cipher.decrypt(&sealed, b"v1").unwrap(), b"sk_live_123");
    }

    #[test]
    fn test_random_nonce_per_call() {
        let cipher = Cipher::new(&[7u8; KEY_SIZE]).unwrap();
        let a = cipher.encrypt(b"same", b"").unwrap();
        let b = cipher.encrypt(b"same", b"").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_aad_or_key_fails() {
        let cipher = Cipher::new(&[7u8; KEY_SIZE]).unwrap();
        let sealed = cipher.encrypt(b"secret", b"v1").unwrap();
        assert!(cipher.decrypt(&sealed, b"v2").is_err());

        let other = Cipher::new(&[8u8; KEY_SIZE]).unwrap();
        assert!(other.decrypt(&sealed, b"v1").is_err());
    }

    #[test]
    fn test_tampered_and_short_payloads_fail() {
        let cipher = Cipher::new(&[7u8; KEY_SIZE]).unwrap();
        let mut sealed = cipher.encrypt(b"secret", b"").unwrap();
        sealed[NONCE_SIZE] ^= 0x01;
        assert!(cipher.decrypt(&sealed, b"").is_err());

        let err = cipher.decrypt(&[0u8; NONCE_SIZE + TAG_SIZE - 1], b"").unwrap_err();
        assert!(matches!(err, SecurityError::InvalidCiphertext { .. }));
    }

    #[test]
    fn test_passphrase_cipher_interoperates() {
        let salt = generate_salt().unwrap();
        let a = Cipher::from_passphrase(b"correct horse", &salt, FAST).unwrap();
        let b = Cipher::from_passphrase(b"correct horse", &salt, FAST).unwrap();
        let sealed = a.encrypt(b"payload", b"").unwrap();
        assert_eq!(b.decrypt(&sealed, b"").unwrap(), b"payload");
    }
}
