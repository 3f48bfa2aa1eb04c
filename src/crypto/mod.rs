//! Cryptographic layer for the Agile Keychain format.
//!
//! This module provides:
//! - the format's fixed primitives — PBKDF2-HMAC-SHA1, OpenSSL KDF,
//!   AES-128-CBC, `Salted__` blob framing (`codec`)
//! - security-level key wrapping, unlocking, and rewrapping (`keystore`)
//! - per-item payload encryption (`payload`)

pub mod codec;
pub mod keystore;
pub mod payload;

pub use keystore::{KeyFile, KeyStore, SecurityLevel, WrappedKey};
pub use payload::{decrypt_payload, encrypt_payload};

use zeroize::Zeroizing;

use crate::errors::Result;

/// The seam between the vault API and whatever holds the unwrapped keys.
///
/// Implemented by [`KeyStore`] for in-process use (vault creation, password
/// change) and by the agent client stub, which forwards both calls over the
/// agent socket so the CLI never holds level keys itself.
pub trait Cryptor {
    /// Encrypt a plaintext payload under the given security level.
    fn encrypt(&self, level: SecurityLevel, plaintext: &[u8]) -> Result<String>;

    /// Decrypt a payload blob under the given security level.
    fn decrypt(&self, level: SecurityLevel, blob: &str) -> Result<Zeroizing<Vec<u8>>>;
}
