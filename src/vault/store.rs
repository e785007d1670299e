//! High-level vault operations for one owner.
//!
//! `Vault` binds the lock state machine to a record store so that the
//! rest of the application can work with simple method calls like
//! `vault.save(draft)`.  Plaintext goes in through `save`/`update`, is
//! encrypted under the current key, and only the envelope crosses the
//! store boundary.  `reveal` is the only way back to plaintext.

use std::sync::Arc;

use chrono::Utc;

use crate::errors::Result;
use crate::records::{RecordPatch, RecordStore, RecordsCallback, Subscription};

use super::lock::VaultLock;
use super::record::{CredentialDraft, CredentialRecord, CredentialUpdate, OwnerId, RecordId};

/// The main vault handle for a signed-in owner.
pub struct Vault {
    owner_id: OwnerId,
    lock: Arc<VaultLock>,
    records: Arc<dyn RecordStore>,
}

impl Vault {
    /// Build a vault over an owner's records.  Starts Locked.
    pub fn new(owner_id: OwnerId, lock: Arc<VaultLock>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            owner_id,
            lock,
            records,
        }
    }

    /// The owning account's id.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    /// Encrypt a draft's secret and persist it as a new record.
    ///
    /// Fails with `VaultLocked` unless the vault is unlocked.  Returns
    /// the store-assigned record id.
    pub fn save(&self, draft: CredentialDraft) -> Result<RecordId> {
        let secret = self.lock.encrypt(&draft.secret)?;

        let now = Utc::now();
        let record = CredentialRecord {
            id: String::new(), // assigned by the store
            icon: draft.icon,
            category: draft.category,
            name: draft.name,
            secret,
            owner_id: self.owner_id.clone(),
            created_at: now,
            updated_at: now,
        };

        let id = self.records.create(record)?;
        tracing::debug!(record = %id, "credential saved");
        Ok(id)
    }

    /// Apply a partial update to an existing credential.
    ///
    /// A new secret, if present, is re-encrypted under the current key
    /// (so this needs the vault unlocked); metadata-only updates do not
    /// touch the cipher.  `updated_at` is bumped either way and
    /// `created_at` is never altered.
    pub fn update(&self, id: &str, changes: CredentialUpdate) -> Result<()> {
        let secret = match changes.secret.as_deref() {
            Some(plaintext) => Some(self.lock.encrypt(plaintext)?),
            None => None,
        };

        let patch = RecordPatch {
            icon: changes.icon,
            category: changes.category,
            name: changes.name,
            secret,
            updated_at: Some(Utc::now()),
        };

        self.records.update(id, patch)?;
        tracing::debug!(record = %id, "credential updated");
        Ok(())
    }

    /// Delete a credential by id.
    ///
    /// No decryption happens, so this works while Locked.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.records.delete(id)?;
        tracing::debug!(record = %id, "credential deleted");
        Ok(())
    }

    /// Decrypt one record's secret.
    ///
    /// Failures are per-record: a `DecryptionFailed` on one envelope
    /// says nothing about the others, so callers rendering a list should
    /// keep going and show a placeholder for the failed entry.
    pub fn reveal(&self, record: &CredentialRecord) -> Result<String> {
        self.lock.decrypt(&record.secret)
    }

    /// Subscribe to this owner's records.
    ///
    /// Delivers encrypted records; pair with `reveal` while unlocked.
    /// Notifications stop when the returned `Subscription` drops.
    pub fn watch(&self, on_change: RecordsCallback) -> Result<Subscription> {
        self.records.query_by_owner(&self.owner_id, on_change)
    }

    // ------------------------------------------------------------------
    // Lock passthroughs
    // ------------------------------------------------------------------

    /// Whether the vault currently holds a key.
    pub fn is_unlocked(&self) -> bool {
        self.lock.is_unlocked()
    }

    /// The underlying lock, for callers that manage unlocking directly.
    pub fn lock_handle(&self) -> &Arc<VaultLock> {
        &self.lock
    }
}
