//! Vault module — lock state machine and credential operations.
//!
//! This module provides:
//! - `CredentialRecord` and its plaintext-bearing input types (`record`)
//! - The `VaultLock` state machine guarding the derived key (`lock`)
//! - High-level `Vault` operations over a record store (`store`)

pub mod lock;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use lock::VaultLock;
pub use record::{CredentialDraft, CredentialRecord, CredentialUpdate};
pub use store::Vault;
