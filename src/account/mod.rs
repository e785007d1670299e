//! Account service collaborator contract.
//!
//! Authentication is owned by an external identity provider; the core
//! only consumes the narrow contract below.  The one piece of vault
//! state that rides along with an account is its key-derivation salt:
//! generated at sign-up, stored non-secret on the profile, and handed
//! to the KDF at unlock time.

use serde::{Deserialize, Serialize};

use crate::crypto::Salt;
use crate::errors::Result;
use crate::vault::record::OwnerId;

pub mod memory;

pub use memory::MemoryAccountService;

/// A signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Provider-assigned account id; doubles as the record owner id.
    pub id: OwnerId,

    /// The sign-in email address.
    pub email: String,

    /// Per-account KDF salt.  Not secret, but required to re-derive the
    /// vault key on a returning device.
    pub key_salt: Salt,
}

/// Callback invoked whenever the sign-in state changes.  `None` means
/// signed out.
pub type AccountCallback = Box<dyn Fn(Option<Account>) + Send + Sync>;

/// Sign-up, sign-in, sign-out, and change notification.
pub trait AccountService: Send + Sync {
    /// Register a new account and sign it in.
    fn sign_up(&self, email: &str, password: &str) -> Result<Account>;

    /// Sign in with existing credentials.
    fn sign_in(&self, email: &str, password: &str) -> Result<Account>;

    /// Sign out the current account, if any.  Idempotent.
    fn sign_out(&self) -> Result<()>;

    /// The currently signed-in account.
    fn current_account(&self) -> Option<Account>;

    /// Subscribe to sign-in state changes.  Notifications stop when the
    /// returned `AccountWatch` is dropped.
    fn on_account_changed(&self, on_change: AccountCallback) -> AccountWatch;
}

/// RAII guard for an account-change subscription.
pub struct AccountWatch {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl AccountWatch {
    /// Wrap a cancellation closure to run when the guard drops.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for AccountWatch {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for AccountWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccountWatch(..)")
    }
}
