//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - AES-256-GCM envelope encryption and decryption (`encryption`)
//! - PBKDF2-SHA256 password-based key derivation (`kdf`)
//! - The zeroizing `DerivedKey` wrapper and HKDF expansion (`keys`)
//! - The versioned `CipherEnvelope` container (`envelope`)

pub mod encryption;
pub mod envelope;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use credvault::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt};
pub use envelope::{CipherEnvelope, ENVELOPE_VERSION};
pub use kdf::{derive_key, derive_key_with_params, KdfParams, Salt};
pub use keys::DerivedKey;
