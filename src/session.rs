//! Session wiring — explicit construction on sign-in, teardown on
//! sign-out.
//!
//! A `Session` is the context object that replaces ambient "current
//! user" and "master key" globals.  It is built from a signed-in
//! account, owns the vault lock, and subscribes to the account service
//! so that a sign-out forces the vault Locked no matter what else is in
//! flight.  Dropping the session tears the subscription down.

use std::sync::Arc;

use crate::account::{Account, AccountService, AccountWatch};
use crate::config::Settings;
use crate::crypto::KdfParams;
use crate::errors::{CredVaultError, Result};
use crate::records::RecordStore;
use crate::vault::{Vault, VaultLock};

/// One authenticated user's vault session.
pub struct Session {
    account: Account,
    lock: Arc<VaultLock>,
    vault: Vault,
    kdf_params: KdfParams,
    // Keeps the sign-out wiring alive for the session's lifetime.
    _watch: AccountWatch,
}

impl Session {
    /// Start a session for the currently signed-in account.
    ///
    /// Fails with `AuthError` when nobody is signed in.  The session
    /// begins Locked; call `unlock` with the master password.
    pub fn start(
        accounts: &dyn AccountService,
        records: Arc<dyn RecordStore>,
        settings: &Settings,
    ) -> Result<Session> {
        let account = accounts
            .current_account()
            .ok_or_else(|| CredVaultError::AuthError("no account is signed in".into()))?;

        let lock = Arc::new(VaultLock::new());
        let vault = Vault::new(account.id.clone(), Arc::clone(&lock), records);

        // Sign-out (or a switch to a different account) forces Locked,
        // overriding any in-progress operation.
        let session_account_id = account.id.clone();
        let watched_lock = Arc::clone(&lock);
        let watch = accounts.on_account_changed(Box::new(move |current| {
            let still_ours = current
                .as_ref()
                .is_some_and(|a| a.id == session_account_id);
            if !still_ours {
                watched_lock.lock();
            }
        }));

        tracing::info!(account = %account.id, "session started");
        Ok(Session {
            account,
            lock,
            vault,
            kdf_params: settings.kdf_params(),
            _watch: watch,
        })
    }

    /// The signed-in account this session belongs to.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Vault operations for this session's owner.
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Derive the key from the master password and unlock the vault.
    ///
    /// Uses the account's salt and the configured KDF cost.  Slow by
    /// design — run it off the interaction path.  A wrong password is
    /// not detected here; it surfaces as `DecryptionFailed` on first
    /// use.
    pub fn unlock(&self, master_password: &str) -> Result<()> {
        self.lock
            .unlock(master_password, &self.account.key_salt, &self.kdf_params)
    }

    /// Discard the key immediately.
    pub fn lock(&self) {
        self.lock.lock();
    }

    /// Whether the vault currently holds a key.
    pub fn is_unlocked(&self) -> bool {
        self.lock.is_unlocked()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The key must not outlive the session that owns it.
        self.lock.lock();
        tracing::info!(account = %self.account.id, "session ended");
    }
}
