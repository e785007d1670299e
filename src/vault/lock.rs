//! The vault lock state machine.
//!
//! A `VaultLock` is either Locked (no key) or Unlocked (holding the
//! derived key).  Every cipher operation goes through it:
//!
//! - `unlock` derives the key from the master password and swaps it in.
//!   No correctness check happens here — the crate stores no verifier
//!   hash, so a wrong password yields a wrong-but-valid key that only
//!   surfaces on the first failed decrypt.
//! - `lock` discards the crate's reference to the key unconditionally.
//! - `encrypt`/`decrypt` take one atomic key snapshot per call and fail
//!   with `VaultLocked` when no key is held.
//!
//! Operations already in flight when `lock` runs keep their `Arc`
//! snapshot and complete against the prior key; the key's memory is
//! zeroized once the last reference drops.

use std::sync::{Arc, RwLock};

use crate::crypto::{self, CipherEnvelope, DerivedKey, KdfParams, Salt};
use crate::errors::{CredVaultError, Result};

/// Gates all encrypt/decrypt traffic on the presence of a derived key.
///
/// `Send + Sync`: embedders should call `unlock` from a worker thread,
/// since key derivation takes hundreds of milliseconds.
pub struct VaultLock {
    // `None` = Locked, `Some` = Unlocked.  Writes only on transitions;
    // cipher calls take the read side and clone the Arc.
    key: RwLock<Option<Arc<DerivedKey>>>,
}

impl VaultLock {
    /// Create a lock in the Locked state.
    pub fn new() -> Self {
        Self {
            key: RwLock::new(None),
        }
    }

    /// Derive a key from the master password and transition to Unlocked.
    ///
    /// Derivation runs before the state lock is taken, so concurrent
    /// cipher calls never stall behind the slow KDF.  Unlocking while
    /// already unlocked replaces the held key.
    pub fn unlock(&self, master_password: &str, salt: &Salt, params: &KdfParams) -> Result<()> {
        let derived = crypto::derive_key_with_params(master_password, salt, params)?;

        let mut slot = self.key.write().expect("vault lock poisoned");
        *slot = Some(Arc::new(derived));
        tracing::info!("vault unlocked");
        Ok(())
    }

    /// Discard the key and transition to Locked.  Idempotent.
    pub fn lock(&self) {
        let mut slot = self.key.write().expect("vault lock poisoned");
        if slot.take().is_some() {
            tracing::info!("vault locked");
        }
    }

    /// Whether a key is currently held.
    pub fn is_unlocked(&self) -> bool {
        self.key.read().expect("vault lock poisoned").is_some()
    }

    /// Encrypt plaintext under the current key.
    ///
    /// Fails with `VaultLocked` while Locked — never prompts an implicit
    /// unlock.
    pub fn encrypt(&self, plaintext: &str) -> Result<CipherEnvelope> {
        let key = self.key_snapshot()?;
        crypto::encrypt(&key, plaintext)
    }

    /// Decrypt an envelope under the current key.
    ///
    /// Fails with `VaultLocked` while Locked, `DecryptionFailed` when
    /// the held key does not match the envelope.
    pub fn decrypt(&self, envelope: &CipherEnvelope) -> Result<String> {
        let key = self.key_snapshot()?;
        crypto::decrypt(&key, envelope)
    }

    /// Take a single atomic snapshot of the current key.
    fn key_snapshot(&self) -> Result<Arc<DerivedKey>> {
        self.key
            .read()
            .expect("vault lock poisoned")
            .clone()
            .ok_or(CredVaultError::VaultLocked)
    }
}

impl Default for VaultLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocked(password: &str) -> (VaultLock, Salt) {
        let lock = VaultLock::new();
        let salt = Salt::generate();
        lock.unlock(password, &salt, &KdfParams { iterations: 100_000 })
            .unwrap();
        (lock, salt)
    }

    #[test]
    fn starts_locked() {
        let lock = VaultLock::new();
        assert!(!lock.is_unlocked());
        assert!(matches!(
            lock.encrypt("x"),
            Err(CredVaultError::VaultLocked)
        ));
    }

    #[test]
    fn unlock_then_lock_round_trip() {
        let (lock, _salt) = unlocked("correct horse");
        assert!(lock.is_unlocked());

        let envelope = lock.encrypt("s3cr3t").unwrap();
        assert_eq!(lock.decrypt(&envelope).unwrap(), "s3cr3t");

        lock.lock();
        assert!(!lock.is_unlocked());
        assert!(matches!(
            lock.decrypt(&envelope),
            Err(CredVaultError::VaultLocked)
        ));
    }

    #[test]
    fn lock_is_idempotent() {
        let lock = VaultLock::new();
        lock.lock();
        lock.lock();
        assert!(!lock.is_unlocked());
    }

    #[test]
    fn unlock_with_empty_password_is_rejected() {
        let lock = VaultLock::new();
        let salt = Salt::generate();
        let result = lock.unlock("", &salt, &KdfParams::default());
        assert!(matches!(result, Err(CredVaultError::InvalidInput(_))));
        assert!(!lock.is_unlocked());
    }
}
