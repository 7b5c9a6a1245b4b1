//! Credential encryption at rest.
//!
//! - [`Cipher`] - AES-256-GCM with random nonces; keys from raw bytes or Argon2id
//! - [`KeyRing`] - loaded key versions, one of them active
//! - [`CredentialCipher`] - `v<n>::<payload>` credential strings and re-keying
//! - [`Secret`] - zeroizing plaintext holder

mod credential;
mod crypto;
mod keyring;
mod secret;

pub use credential::CredentialCipher;
pub use crypto::{
    Argon2Params, Cipher, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE, derive_key, generate_key,
    generate_salt,
};
pub use keyring::{KeyRing, generate_encoded_key};
pub use secret::{MaskedSecret, Secret};
