//! Record store collaborator contract.
//!
//! The record store is an external document service (the hosted backend
//! in production).  The core only needs four operations: create, patch,
//! delete, and an owner-scoped live query.  Records cross this boundary
//! already encrypted — a store implementation never sees plaintext and
//! never needs the derived key.

use chrono::{DateTime, Utc};

use crate::crypto::CipherEnvelope;
use crate::errors::Result;
use crate::vault::record::{CredentialRecord, OwnerId, RecordId};

pub mod memory;

pub use memory::MemoryRecordStore;

/// Callback invoked with the owner's full record snapshot on every
/// change, starting with the current state at subscription time.
pub type RecordsCallback = Box<dyn Fn(Vec<CredentialRecord>) + Send + Sync>;

/// Field-level changes applied by `RecordStore::update`.
///
/// `None` fields are left untouched.  The secret arrives here already
/// re-encrypted; plaintext never crosses the store boundary.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub icon: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub secret: Option<CipherEnvelope>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// CRUD plus live owner-scoped queries over opaque encrypted records.
pub trait RecordStore: Send + Sync {
    /// Persist a new record.  The store assigns and returns the id; any
    /// id already on the record is ignored.
    fn create(&self, record: CredentialRecord) -> Result<RecordId>;

    /// Apply a partial update to an existing record.
    fn update(&self, id: &str, patch: RecordPatch) -> Result<()>;

    /// Delete a record by id.  No decryption is involved.
    fn delete(&self, id: &str) -> Result<()>;

    /// Subscribe to the given owner's records.
    ///
    /// The callback fires immediately with the current snapshot, then
    /// again after every change to that owner's records, until the
    /// returned `Subscription` is dropped.
    fn query_by_owner(&self, owner_id: &OwnerId, on_change: RecordsCallback)
        -> Result<Subscription>;
}

/// RAII guard for a live query.  Dropping it stops the notifications.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a cancellation closure to run when the guard drops.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription(..)")
    }
}
