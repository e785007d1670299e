//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! PBKDF2 is deliberately slow: the iteration count makes brute-forcing a
//! master password expensive.  Parameters are configurable via `KdfParams`
//! (loaded from `.credvault.toml` or sensible defaults).  The same
//! (password, salt, iterations) triple always derives the same key, which
//! is what lets a returning user unlock with nothing but the password.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{CredVaultError, Result};

use super::keys::{expand_cipher_key, DerivedKey, KEY_LEN};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Default PBKDF2 iteration count.
///
/// Matches the cost the vault has always used; well above the floor.
const DEFAULT_ITERATIONS: u32 = 150_000;

/// Minimum allowed iteration count.  Anything lower makes offline
/// guessing too cheap.
const MIN_ITERATIONS: u32 = 100_000;

/// Configurable PBKDF2 parameters.
///
/// These map 1:1 to the fields in `Settings` so embedders can pass
/// whatever the user configured in `.credvault.toml`.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    /// Number of PBKDF2 iterations (default: 150 000).
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// A per-account key-derivation salt.
///
/// Salts are not secret: they live on the account profile and travel as
/// base64 strings.  Each account gets its own random salt so identical
/// master passwords on different accounts still derive different keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Generate a cryptographically random 32-byte salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Build a salt from raw bytes.  Fails unless exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            CredVaultError::InvalidInput(format!(
                "salt must be {SALT_LEN} bytes (got {})",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Access the raw salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

// Serialized as a base64 string (the account profile is JSON-shaped).
impl Serialize for Salt {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        super::envelope::base64_encode(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = super::envelope::base64_decode(deserializer)?;
        Salt::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Derive a 256-bit cipher key from a master password and salt.
///
/// Uses the default iteration count.  Prefer `derive_key_with_params`
/// when you have a `Settings`.
pub fn derive_key(master_password: &str, salt: &Salt) -> Result<DerivedKey> {
    derive_key_with_params(master_password, salt, &KdfParams::default())
}

/// Derive a 256-bit cipher key with explicit PBKDF2 parameters.
///
/// The password is stretched with PBKDF2-HMAC-SHA256, then the stretch
/// output is expanded into the final cipher key with HKDF under a fixed
/// domain label.  Deterministic: identical inputs always yield an
/// identical key.  Enforces a minimum iteration count to prevent
/// dangerously weak KDF settings.
pub fn derive_key_with_params(
    master_password: &str,
    salt: &Salt,
    params: &KdfParams,
) -> Result<DerivedKey> {
    if master_password.is_empty() {
        return Err(CredVaultError::InvalidInput(
            "master password cannot be empty".into(),
        ));
    }
    if params.iterations < MIN_ITERATIONS {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "iterations must be at least {MIN_ITERATIONS} (got {})",
            params.iterations
        )));
    }

    // Stretch the password.  This is the slow part.
    let mut stretched = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(
        master_password.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut stretched,
    );

    // Expand into the final cipher key, then wipe the intermediate.
    let key = expand_cipher_key(&stretched);
    stretched.zeroize();

    key
}
