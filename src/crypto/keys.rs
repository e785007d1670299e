//! The `DerivedKey` wrapper and HKDF-SHA256 key expansion.
//!
//! The PBKDF2 stretch output is not used as the cipher key directly:
//! HKDF (RFC 5869) expands it under a fixed context label so the cipher
//! key is domain-separated from any future sub-key this crate derives.
//!
//! `DerivedKey` is the only type that ever holds the working key.  It
//! zeroes its memory on drop, refuses to print its bytes, and compares
//! in constant time.

use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{CredVaultError, Result};

/// Length of the derived cipher key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Context label binding the HKDF output to its one purpose.
const CIPHER_KEY_INFO: &[u8] = b"credvault/cipher-key/v1";

/// Expand a PBKDF2 stretch output into the final cipher key.
///
/// We skip the `extract` step and use the stretch output directly as the
/// pseudo-random key (PRK), because it already has high entropy (it came
/// from PBKDF2 over the full password).
pub(crate) fn expand_cipher_key(ikm: &[u8]) -> Result<DerivedKey> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(CIPHER_KEY_INFO, &mut okm)
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    let key = DerivedKey::new(okm);
    okm.zeroize();
    Ok(key)
}

/// A 32-byte symmetric cipher key that automatically zeroes its memory
/// when dropped.
///
/// Held only in volatile memory for the lifetime of an unlocked session;
/// never serialized, never written to storage, never logged.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to build the AEAD cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

// Constant-time comparison — key equality must not leak timing.
impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for DerivedKey {}

// Never print key material, not even in debug output.
impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}
