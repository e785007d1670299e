//! Credential record types stored through the record store.
//!
//! A `CredentialRecord` is what leaves the client: everything on it is
//! plain metadata except `secret`, which is always a `CipherEnvelope`.
//! Plaintext exists only in the input types (`CredentialDraft`,
//! `CredentialUpdate`) and in the return value of a successful reveal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::CipherEnvelope;
use crate::errors::{CredVaultError, Result};

/// Identifier assigned to a record by the record store.
pub type RecordId = String;

/// Identifier of the account that owns a record.
pub type OwnerId = String;

/// A single stored credential.  `secret` is at rest in encrypted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Store-assigned identifier.
    pub id: RecordId,

    /// Display icon chosen in the UI (e.g. an emoji).
    pub icon: String,

    /// Free-form grouping category (e.g. "Banking").
    pub category: String,

    /// Human-readable name (e.g. "Bank").
    pub name: String,

    /// The encrypted secret.
    pub secret: CipherEnvelope,

    /// The owning account's id.  The store only ever queries by this.
    pub owner_id: OwnerId,

    /// When this credential was first created.
    pub created_at: DateTime<Utc>,

    /// When this credential was last updated.
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Serialize to the JSON wire form used by store adapters.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CredVaultError::SerializationError(format!("record: {e}")))
    }

    /// Deserialize from the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CredVaultError::SerializationError(format!("record: {e}")))
    }
}

/// Input for saving a new credential.  `secret` is plaintext and never
/// reaches the record store — the vault encrypts it first.
#[derive(Debug, Clone)]
pub struct CredentialDraft {
    pub icon: String,
    pub category: String,
    pub name: String,
    pub secret: String,
}

/// Partial update for an existing credential.  `None` fields are left
/// untouched; a `Some` secret is re-encrypted under the current key.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    pub icon: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub secret: Option<String>,
}
