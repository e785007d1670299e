//! In-memory record store.
//!
//! Reference implementation of `RecordStore` used by the test suite and
//! by embedders that want a local, non-persistent backend.  Mirrors the
//! behavior expected of a remote document store: store-assigned ids and
//! snapshot-style change notification per owner.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use uuid::Uuid;

use crate::errors::{CredVaultError, Result};
use crate::vault::record::{CredentialRecord, OwnerId, RecordId};

use super::{RecordPatch, RecordStore, RecordsCallback, Subscription};

struct Watcher {
    id: u64,
    owner_id: OwnerId,
    callback: Arc<RecordsCallback>,
}

struct StoreInner {
    records: Mutex<HashMap<RecordId, CredentialRecord>>,
    watchers: Mutex<Vec<Watcher>>,
    next_watcher_id: AtomicU64,
}

/// Mutex-guarded map of records with live owner-scoped notification.
#[derive(Clone)]
pub struct MemoryRecordStore {
    inner: Arc<StoreInner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                records: Mutex::new(HashMap::new()),
                watchers: Mutex::new(Vec::new()),
                next_watcher_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current records for an owner, oldest first.  Test convenience —
    /// production callers go through `query_by_owner`.
    pub fn records_for(&self, owner_id: &str) -> Vec<CredentialRecord> {
        self.inner.snapshot(owner_id)
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    fn snapshot(&self, owner_id: &str) -> Vec<CredentialRecord> {
        let records = self.records.lock().expect("record store poisoned");
        let mut list: Vec<CredentialRecord> = records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        // Stable order: oldest first, id as tie-breaker.
        list.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        list
    }

    /// Deliver a fresh snapshot to every watcher of `owner_id`.
    ///
    /// Callbacks run after both internal locks are released, so a
    /// callback may call back into the store.
    fn notify_owner(&self, owner_id: &str) {
        let snapshot = self.snapshot(owner_id);
        let callbacks: Vec<Arc<RecordsCallback>> = {
            let watchers = self.watchers.lock().expect("record store poisoned");
            watchers
                .iter()
                .filter(|w| w.owner_id == owner_id)
                .map(|w| Arc::clone(&w.callback))
                .collect()
        };

        for callback in callbacks {
            callback(snapshot.clone());
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn create(&self, mut record: CredentialRecord) -> Result<RecordId> {
        let id = Uuid::new_v4().to_string();
        record.id = id.clone();

        let owner_id = record.owner_id.clone();
        {
            let mut records = self.inner.records.lock().expect("record store poisoned");
            records.insert(id.clone(), record);
        }
        tracing::debug!(record = %id, "record created");

        self.inner.notify_owner(&owner_id);
        Ok(id)
    }

    fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        let owner_id = {
            let mut records = self.inner.records.lock().expect("record store poisoned");
            let record = records
                .get_mut(id)
                .ok_or_else(|| CredVaultError::RecordNotFound(id.to_string()))?;

            if let Some(icon) = patch.icon {
                record.icon = icon;
            }
            if let Some(category) = patch.category {
                record.category = category;
            }
            if let Some(name) = patch.name {
                record.name = name;
            }
            if let Some(secret) = patch.secret {
                record.secret = secret;
            }
            if let Some(updated_at) = patch.updated_at {
                record.updated_at = updated_at;
            }
            record.owner_id.clone()
        };
        tracing::debug!(record = %id, "record updated");

        self.inner.notify_owner(&owner_id);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let owner_id = {
            let mut records = self.inner.records.lock().expect("record store poisoned");
            let record = records
                .remove(id)
                .ok_or_else(|| CredVaultError::RecordNotFound(id.to_string()))?;
            record.owner_id
        };
        tracing::debug!(record = %id, "record deleted");

        self.inner.notify_owner(&owner_id);
        Ok(())
    }

    fn query_by_owner(
        &self,
        owner_id: &OwnerId,
        on_change: RecordsCallback,
    ) -> Result<Subscription> {
        let callback = Arc::new(on_change);
        let watcher_id = self.inner.next_watcher_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut watchers = self.inner.watchers.lock().expect("record store poisoned");
            watchers.push(Watcher {
                id: watcher_id,
                owner_id: owner_id.clone(),
                callback: Arc::clone(&callback),
            });
        }

        // Initial delivery: the subscriber sees the current state right
        // away, before any mutation happens.
        callback(self.inner.snapshot(owner_id));

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut watchers = inner.watchers.lock().expect("record store poisoned");
                watchers.retain(|w| w.id != watcher_id);
            }
        }))
    }
}
