//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! stores it in the envelope's `iv` field.  `decrypt` verifies the GCM
//! auth tag before returning anything: a wrong key, a tampered envelope,
//! or an unsupported envelope version is a hard `DecryptionFailed`,
//! never a best-effort string.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroize;

use crate::errors::{CredVaultError, Result};

use super::envelope::{CipherEnvelope, ENVELOPE_VERSION};
use super::keys::DerivedKey;

/// Encrypt `plaintext` under `key` into a fresh envelope.
///
/// Every call draws a new random nonce, so encrypting the same plaintext
/// twice produces two different envelopes.
pub fn encrypt(key: &DerivedKey, plaintext: &str) -> Result<CipherEnvelope> {
    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // Generate a random 12-byte nonce.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // Encrypt and authenticate the plaintext.
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CredVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(CipherEnvelope {
        version: ENVELOPE_VERSION,
        iv: nonce.to_vec(),
        ciphertext,
    })
}

/// Decrypt an envelope that was produced by `encrypt`.
///
/// Fails with `DecryptionFailed` when the key is wrong, the envelope is
/// malformed or from an unsupported version, or the auth tag does not
/// verify.
pub fn decrypt(key: &DerivedKey, envelope: &CipherEnvelope) -> Result<String> {
    if !envelope.is_supported() {
        return Err(CredVaultError::DecryptionFailed);
    }

    let nonce = Nonce::from_slice(&envelope.iv);

    // Build the cipher from the raw key bytes.
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CredVaultError::DecryptionFailed)?;

    // Decrypt and verify the auth tag.
    let plaintext_bytes = cipher
        .decrypt(nonce, envelope.ciphertext.as_ref())
        .map_err(|_| CredVaultError::DecryptionFailed)?;

    // Convert to String via from_utf8 which takes ownership (no clone).
    // On error, zeroize the bytes inside the error before discarding.
    String::from_utf8(plaintext_bytes).map_err(|e| {
        let mut bad_bytes = e.into_bytes();
        bad_bytes.zeroize();
        CredVaultError::DecryptionFailed
    })
}
