//! The versioned ciphertext envelope.
//!
//! A `CipherEnvelope` is the at-rest/on-the-wire form of a secret:
//!
//! ```text
//! { version: 1, iv: <12 bytes, base64>, ciphertext: <bytes + 16-byte tag, base64> }
//! ```
//!
//! The iv is public; it is required to decrypt but reveals nothing.  No
//! key material is ever embedded.  The version discriminator pins the
//! construction to AES-256-GCM — envelopes written by the retired
//! stream-cipher scheme carry no version and are rejected outright.

use serde::{Deserialize, Serialize};

/// Current envelope version (AES-256-GCM with explicit iv).
pub const ENVELOPE_VERSION: u8 = 1;

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// An encrypted secret plus the public parameters needed to decrypt it.
///
/// Meaningless without the exact key that created it; decryption with
/// any other key fails the integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherEnvelope {
    /// Envelope format version.
    pub version: u8,

    /// The per-encryption random nonce (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    /// Ciphertext with the GCM auth tag appended (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,
}

impl CipherEnvelope {
    /// Whether this envelope was written by a construction this crate
    /// can read.
    pub fn is_supported(&self) -> bool {
        self.version == ENVELOPE_VERSION && self.iv.len() == NONCE_LEN
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded byte fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
