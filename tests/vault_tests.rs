//! Integration tests for the vault lock state machine and credential
//! operations.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use credvault::crypto::{KdfParams, Salt};
use credvault::errors::CredVaultError;
use credvault::records::MemoryRecordStore;
use credvault::vault::{CredentialDraft, CredentialUpdate, Vault, VaultLock};

/// Fast-but-valid KDF cost for tests (the enforced minimum).
const TEST_PARAMS: KdfParams = KdfParams {
    iterations: 100_000,
};

/// Helper: a vault over a fresh in-memory store, still Locked.
fn test_vault(owner: &str) -> (MemoryRecordStore, Arc<VaultLock>, Vault) {
    let store = MemoryRecordStore::new();
    let lock = Arc::new(VaultLock::new());
    let vault = Vault::new(
        owner.to_string(),
        Arc::clone(&lock),
        Arc::new(store.clone()),
    );
    (store, lock, vault)
}

fn bank_draft() -> CredentialDraft {
    CredentialDraft {
        icon: "🏦".into(),
        category: "Banking".into(),
        name: "Bank".into(),
        secret: "s3cr3t".into(),
    }
}

// ---------------------------------------------------------------------------
// Lock gating
// ---------------------------------------------------------------------------

#[test]
fn save_fails_while_locked() {
    let (_store, _lock, vault) = test_vault("alice");

    let result = vault.save(bank_draft());
    assert!(matches!(result, Err(CredVaultError::VaultLocked)));
}

#[test]
fn reveal_fails_while_locked() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    vault.save(bank_draft()).unwrap();
    lock.lock();

    let records = store.records_for("alice");
    assert!(matches!(
        vault.reveal(&records[0]),
        Err(CredVaultError::VaultLocked)
    ));
}

#[test]
fn delete_works_while_locked() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    let id = vault.save(bank_draft()).unwrap();
    lock.lock();

    // Deletion needs no decryption, so the lock state is irrelevant.
    vault.delete(&id).unwrap();
    assert!(store.records_for("alice").is_empty());
}

#[test]
fn metadata_update_works_while_locked() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    let id = vault.save(bank_draft()).unwrap();
    lock.lock();

    // No new secret -> no cipher work -> allowed while Locked.
    vault
        .update(
            &id,
            CredentialUpdate {
                name: Some("Bank (new)".into()),
                ..CredentialUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(store.records_for("alice")[0].name, "Bank (new)");
}

// ---------------------------------------------------------------------------
// Save / reveal round-trip
// ---------------------------------------------------------------------------

#[test]
fn saved_secret_is_not_stored_in_plaintext() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    vault.save(bank_draft()).unwrap();

    let records = store.records_for("alice");
    assert_ne!(records[0].secret.ciphertext, b"s3cr3t");

    // The wire form must not leak the plaintext either.
    let json = records[0].to_json().unwrap();
    assert!(!json.contains("s3cr3t"));
}

#[test]
fn lock_then_unlock_again_reads_the_secret_back() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    vault.save(bank_draft()).unwrap();
    lock.lock();

    // Same password + same salt re-derives the same key.
    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    let records = store.records_for("alice");
    assert_eq!(vault.reveal(&records[0]).unwrap(), "s3cr3t");
}

#[test]
fn wrong_password_unlocks_but_cannot_decrypt() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    vault.save(bank_draft()).unwrap();
    lock.lock();

    // No verifier is stored, so the wrong password "works"...
    lock.unlock("wrong", &salt, &TEST_PARAMS).unwrap();
    assert!(vault.is_unlocked());

    // ...until the first decrypt, which must fail hard rather than
    // return a plausible-looking string.
    let records = store.records_for("alice");
    assert!(matches!(
        vault.reveal(&records[0]),
        Err(CredVaultError::DecryptionFailed)
    ));
}

// ---------------------------------------------------------------------------
// Update semantics
// ---------------------------------------------------------------------------

#[test]
fn update_reencrypts_and_preserves_created_at() {
    let (store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();

    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();
    let id = vault.save(bank_draft()).unwrap();

    let before = store.records_for("alice")[0].clone();

    vault
        .update(
            &id,
            CredentialUpdate {
                secret: Some("n3w-s3cr3t".into()),
                ..CredentialUpdate::default()
            },
        )
        .unwrap();

    let after = store.records_for("alice")[0].clone();

    // Fresh nonce, fresh ciphertext.
    assert_ne!(after.secret, before.secret);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);

    assert_eq!(vault.reveal(&after).unwrap(), "n3w-s3cr3t");
}

// ---------------------------------------------------------------------------
// Live watch
// ---------------------------------------------------------------------------

#[test]
fn watch_sees_saves_and_deletes() {
    let (_store, lock, vault) = test_vault("alice");
    let salt = Salt::generate();
    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();

    let snapshots: Arc<std::sync::Mutex<Vec<Vec<String>>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));

    let snapshots_cb = Arc::clone(&snapshots);
    let sub = vault
        .watch(Box::new(move |records| {
            let names = records.iter().map(|r| r.name.clone()).collect();
            snapshots_cb.lock().unwrap().push(names);
        }))
        .unwrap();

    let id = vault.save(bank_draft()).unwrap();
    vault.delete(&id).unwrap();
    drop(sub);

    let seen = snapshots.lock().unwrap();
    // Initial empty snapshot, then the save, then the delete.
    assert_eq!(*seen, vec![vec![], vec!["Bank".to_string()], vec![]]);
}

// ---------------------------------------------------------------------------
// Concurrency: cipher traffic racing lock transitions
// ---------------------------------------------------------------------------

#[test]
fn cipher_calls_racing_a_lock_never_panic() {
    let (_store, lock, _vault) = test_vault("alice");
    let salt = Salt::generate();
    lock.unlock("correct", &salt, &TEST_PARAMS).unwrap();

    let envelope = Arc::new(lock.encrypt("racy").unwrap());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        let envelope = Arc::clone(&envelope);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                // Every outcome must be a clean Ok or VaultLocked —
                // never a torn key, never garbled plaintext.
                match lock.decrypt(&envelope) {
                    Ok(plaintext) => assert_eq!(plaintext, "racy"),
                    Err(CredVaultError::VaultLocked) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
        }));
    }

    thread::sleep(Duration::from_millis(5));
    lock.lock();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(!lock.is_unlocked());
}
