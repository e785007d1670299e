//! In-memory account service.
//!
//! Reference implementation of `AccountService` for tests and local
//! embedding.  Credential checking is a salted SHA-256 hash — enough
//! for a test double, not a production authenticator; real deployments
//! plug in an external identity provider behind the same trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::crypto::Salt;
use crate::errors::{CredVaultError, Result};

use super::{Account, AccountCallback, AccountService, AccountWatch};

struct StoredUser {
    account: Account,
    login_salt: [u8; 16],
    password_hash: [u8; 32],
}

struct AccountWatcher {
    id: u64,
    callback: Arc<AccountCallback>,
}

struct ServiceInner {
    users: Mutex<HashMap<String, StoredUser>>,
    current: Mutex<Option<Account>>,
    watchers: Mutex<Vec<AccountWatcher>>,
    next_watcher_id: AtomicU64,
}

/// Mutex-guarded user table with sign-in state notification.
#[derive(Clone)]
pub struct MemoryAccountService {
    inner: Arc<ServiceInner>,
}

impl MemoryAccountService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                users: Mutex::new(HashMap::new()),
                current: Mutex::new(None),
                watchers: Mutex::new(Vec::new()),
                next_watcher_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryAccountService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceInner {
    fn set_current(&self, account: Option<Account>) {
        {
            let mut current = self.current.lock().expect("account service poisoned");
            *current = account.clone();
        }
        self.notify(account);
    }

    /// Callbacks run after all internal locks are released.
    fn notify(&self, account: Option<Account>) {
        let callbacks: Vec<Arc<AccountCallback>> = {
            let watchers = self.watchers.lock().expect("account service poisoned");
            watchers.iter().map(|w| Arc::clone(&w.callback)).collect()
        };

        for callback in callbacks {
            callback(account.clone());
        }
    }
}

fn hash_password(login_salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(login_salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

impl AccountService for MemoryAccountService {
    fn sign_up(&self, email: &str, password: &str) -> Result<Account> {
        if email.is_empty() || !email.contains('@') {
            return Err(CredVaultError::AuthError(
                "a valid email address is required".into(),
            ));
        }
        if password.is_empty() {
            return Err(CredVaultError::AuthError("password cannot be empty".into()));
        }

        let account = {
            let mut users = self.inner.users.lock().expect("account service poisoned");
            if users.contains_key(email) {
                return Err(CredVaultError::AuthError(format!(
                    "email '{email}' is already registered"
                )));
            }

            let mut login_salt = [0u8; 16];
            OsRng.fill_bytes(&mut login_salt);

            let account = Account {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                // The vault KDF salt is provisioned once, here.
                key_salt: Salt::generate(),
            };

            users.insert(
                email.to_string(),
                StoredUser {
                    account: account.clone(),
                    login_salt,
                    password_hash: hash_password(&login_salt, password),
                },
            );
            account
        };
        tracing::info!(account = %account.id, "account created");

        // Sign-up signs the new account in, like the hosted provider does.
        self.inner.set_current(Some(account.clone()));
        Ok(account)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Account> {
        let account = {
            let users = self.inner.users.lock().expect("account service poisoned");
            let user = users
                .get(email)
                .ok_or_else(|| CredVaultError::AuthError("invalid email or password".into()))?;

            let candidate = hash_password(&user.login_salt, password);
            let ok: bool = candidate.ct_eq(&user.password_hash).into();
            if !ok {
                return Err(CredVaultError::AuthError("invalid email or password".into()));
            }
            user.account.clone()
        };
        tracing::info!(account = %account.id, "signed in");

        self.inner.set_current(Some(account.clone()));
        Ok(account)
    }

    fn sign_out(&self) -> Result<()> {
        let was_signed_in = {
            let current = self.inner.current.lock().expect("account service poisoned");
            current.is_some()
        };

        if was_signed_in {
            tracing::info!("signed out");
            self.inner.set_current(None);
        }
        Ok(())
    }

    fn current_account(&self) -> Option<Account> {
        self.inner
            .current
            .lock()
            .expect("account service poisoned")
            .clone()
    }

    fn on_account_changed(&self, on_change: AccountCallback) -> AccountWatch {
        let callback = Arc::new(on_change);
        let watcher_id = self.inner.next_watcher_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut watchers = self.inner.watchers.lock().expect("account service poisoned");
            watchers.push(AccountWatcher {
                id: watcher_id,
                callback,
            });
        }

        let weak: Weak<ServiceInner> = Arc::downgrade(&self.inner);
        AccountWatch::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut watchers = inner.watchers.lock().expect("account service poisoned");
                watchers.retain(|w| w.id != watcher_id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_then_sign_in() {
        let svc = MemoryAccountService::new();
        let created = svc.sign_up("alice@example.com", "hunter2").unwrap();
        svc.sign_out().unwrap();

        let signed_in = svc.sign_in("alice@example.com", "hunter2").unwrap();
        assert_eq!(signed_in, created);
        assert_eq!(svc.current_account(), Some(signed_in));
    }

    #[test]
    fn sign_in_with_wrong_password_fails() {
        let svc = MemoryAccountService::new();
        svc.sign_up("alice@example.com", "hunter2").unwrap();
        svc.sign_out().unwrap();

        let result = svc.sign_in("alice@example.com", "wrong");
        assert!(matches!(result, Err(CredVaultError::AuthError(_))));
        assert_eq!(svc.current_account(), None);
    }

    #[test]
    fn duplicate_sign_up_fails() {
        let svc = MemoryAccountService::new();
        svc.sign_up("alice@example.com", "hunter2").unwrap();
        let result = svc.sign_up("alice@example.com", "other");
        assert!(matches!(result, Err(CredVaultError::AuthError(_))));
    }

    #[test]
    fn key_salt_is_stable_across_sign_ins() {
        let svc = MemoryAccountService::new();
        let created = svc.sign_up("alice@example.com", "hunter2").unwrap();
        svc.sign_out().unwrap();

        let again = svc.sign_in("alice@example.com", "hunter2").unwrap();
        // Same salt, or the user could never re-derive their vault key.
        assert_eq!(again.key_salt, created.key_salt);
    }

    #[test]
    fn watcher_sees_sign_out() {
        let svc = MemoryAccountService::new();
        let last: Arc<Mutex<Option<Option<Account>>>> = Arc::new(Mutex::new(None));

        let last_cb = Arc::clone(&last);
        let _watch = svc.on_account_changed(Box::new(move |account| {
            *last_cb.lock().unwrap() = Some(account);
        }));

        svc.sign_up("alice@example.com", "hunter2").unwrap();
        assert!(matches!(*last.lock().unwrap(), Some(Some(_))));

        svc.sign_out().unwrap();
        assert!(matches!(*last.lock().unwrap(), Some(None)));
    }
}
