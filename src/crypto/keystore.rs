//! Security-level key management.
//!
//! An Agile Keychain carries one wrapped key per *security level*
//! (conventionally `SL3` and `SL5`).  Each wrapped key is 1024 bytes of
//! random material encrypted under a PBKDF2-derived key, accompanied by a
//! *validator*: the same material encrypted again with a key derived from
//! itself.  There is no MAC — a password is proven correct by the validator
//! decrypting back to the unwrapped material.
//!
//! `KeyStore` holds both forms.  Unwrapped keys live in [`Zeroizing`]
//! buffers and are wiped on `lock` and on drop.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::codec;
use crate::crypto::payload;
use crate::crypto::Cryptor;
use crate::errors::{Result, VaultError};

/// Length of the random key material behind each security level.
const LEVEL_KEY_LEN: usize = 1024;

/// Iteration counts below this mark the vault as malformed.
pub const MIN_ITERATIONS: u32 = 1000;

/// Default PBKDF2 iteration count for newly created vaults.
pub const DEFAULT_ITERATIONS: u32 = 17_000;

/// A named key slot.  `SL5` protects regular item content; `SL3` exists in
/// every keychain but is not used for new items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    SL3,
    SL5,
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityLevel::SL3 => write!(f, "SL3"),
            SecurityLevel::SL5 => write!(f, "SL5"),
        }
    }
}

impl std::str::FromStr for SecurityLevel {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SL3" => Ok(SecurityLevel::SL3),
            "SL5" => Ok(SecurityLevel::SL5),
            other => Err(VaultError::NotFound(format!("security level {other}"))),
        }
    }
}

/// One entry of the `encryptionKeys.js` `list` array, exactly as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedKey {
    pub level: SecurityLevel,
    pub identifier: String,
    pub iterations: u32,
    /// base64 `Salted__` blob decrypting to the 1024-byte key material.
    pub data: String,
    /// The key material encrypted again under a key derived from itself.
    pub validation: String,
}

/// The full `encryptionKeys.js` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    pub list: Vec<WrappedKey>,
    #[serde(rename = "SL3", default, skip_serializing_if = "Option::is_none")]
    pub sl3: Option<String>,
    #[serde(rename = "SL5", default, skip_serializing_if = "Option::is_none")]
    pub sl5: Option<String>,
}

struct LevelEntry {
    wrapped: WrappedKey,
    unwrapped: Option<Zeroizing<Vec<u8>>>,
}

/// Holds the wrapped per-level keys and, after `unlock`, the unwrapped
/// material.
pub struct KeyStore {
    entries: Vec<LevelEntry>,
}

impl KeyStore {
    /// Build a locked store from a parsed `encryptionKeys.js`.
    ///
    /// Rejects vaults with no levels or with an iteration count under the
    /// minimum.
    pub fn from_key_file(file: KeyFile) -> Result<Self> {
        if file.list.is_empty() {
            return Err(VaultError::CorruptVault(
                "encryptionKeys.js lists no security levels".into(),
            ));
        }
        for key in &file.list {
            if key.iterations < MIN_ITERATIONS {
                return Err(VaultError::CorruptVault(format!(
                    "security level {} uses {} PBKDF2 iterations (minimum {MIN_ITERATIONS})",
                    key.level, key.iterations
                )));
            }
        }

        Ok(Self {
            entries: file
                .list
                .into_iter()
                .map(|wrapped| LevelEntry {
                    wrapped,
                    unwrapped: None,
                })
                .collect(),
        })
    }

    /// Generate a fresh key pair (SL3 + SL5) for a new vault.
    ///
    /// The store is returned already unlocked so the caller can encrypt
    /// items right after `new`.
    pub fn generate(master_password: &str, iterations: u32) -> Result<Self> {
        if iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "iteration count {iterations} is below the minimum of {MIN_ITERATIONS}"
            )));
        }

        let mut entries = Vec::with_capacity(2);
        for level in [SecurityLevel::SL3, SecurityLevel::SL5] {
            let mut material = Zeroizing::new(vec![0u8; LEVEL_KEY_LEN]);
            rand::rngs::OsRng.fill_bytes(&mut material);

            let wrapped = wrap_key(level, &material, master_password, iterations)?;
            entries.push(LevelEntry {
                wrapped,
                unwrapped: Some(material),
            });
        }

        Ok(Self { entries })
    }

    /// Unwrap every level key with the master password.
    ///
    /// Succeeds iff the password decrypts each wrapped key AND the
    /// validator decrypts back to the same material.  A failed attempt
    /// leaves existing state untouched, so a wrong password after a
    /// successful unlock does not re-lock the store.
    pub fn unlock(&mut self, master_password: &str) -> Result<()> {
        let mut unwrapped = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let (salt, ciphertext) = codec::decode_salted(&entry.wrapped.data)?;
            let (key, iv) = codec::derive_key(
                master_password.as_bytes(),
                &salt,
                entry.wrapped.iterations,
            );
            let material = Zeroizing::new(codec::aes_cbc_decrypt(&key, &iv, &ciphertext)?);

            // The validator is the material encrypted under a key derived
            // from the material itself; equality proves the password.
            let (vsalt, vct) = codec::decode_salted(&entry.wrapped.validation)?;
            let (vkey, viv) = codec::openssl_kdf(&material, &vsalt);
            let check = Zeroizing::new(codec::aes_cbc_decrypt(&vkey, &viv, &vct)?);
            if *check != *material {
                return Err(VaultError::DecryptError);
            }

            unwrapped.push(material);
        }

        for (entry, material) in self.entries.iter_mut().zip(unwrapped) {
            entry.unwrapped = Some(material);
        }
        Ok(())
    }

    /// Drop all unwrapped key material (zeroed by the wrapper).
    pub fn lock(&mut self) {
        for entry in &mut self.entries {
            entry.unwrapped = None;
        }
    }

    pub fn is_unlocked(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.unwrapped.is_some())
    }

    /// The unwrapped material for a level, or `Locked`/`NotFound`.
    pub fn level_key(&self, level: SecurityLevel) -> Result<&[u8]> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.wrapped.level == level)
            .ok_or_else(|| VaultError::NotFound(format!("security level {level}")))?;
        entry
            .unwrapped
            .as_deref()
            .map(Vec::as_slice)
            .ok_or(VaultError::Locked)
    }

    /// Re-wrap every level under a new master password.
    ///
    /// Verifies the old password first.  The underlying key material is
    /// unchanged, so existing items remain decryptable; only the wrapping
    /// (fresh salt, fresh validator) is replaced.  Persisting the new
    /// `encryptionKeys.js` is the vault store's job.
    pub fn rewrap(&mut self, old_password: &str, new_password: &str) -> Result<()> {
        self.unlock(old_password)?;

        for entry in &mut self.entries {
            let material = entry
                .unwrapped
                .as_ref()
                .expect("unlock above guarantees unwrapped material");
            let mut rewrapped = wrap_key(
                entry.wrapped.level,
                material,
                new_password,
                entry.wrapped.iterations,
            )?;
            // The identifier names the slot, not the wrapping; keep it.
            rewrapped.identifier = entry.wrapped.identifier.clone();
            entry.wrapped = rewrapped;
        }
        Ok(())
    }

    /// Snapshot the wrapped state for persistence.
    pub fn to_key_file(&self) -> KeyFile {
        let list: Vec<WrappedKey> = self.entries.iter().map(|e| e.wrapped.clone()).collect();
        let find = |level| {
            list.iter()
                .find(|k| k.level == level)
                .map(|k| k.identifier.clone())
        };
        KeyFile {
            sl3: find(SecurityLevel::SL3),
            sl5: find(SecurityLevel::SL5),
            list,
        }
    }
}

impl Cryptor for KeyStore {
    fn encrypt(&self, level: SecurityLevel, plaintext: &[u8]) -> Result<String> {
        payload::encrypt_payload(self.level_key(level)?, plaintext)
    }

    fn decrypt(&self, level: SecurityLevel, blob: &str) -> Result<Zeroizing<Vec<u8>>> {
        payload::decrypt_payload(self.level_key(level)?, blob)
    }
}

/// Encrypt key material under a master password and compute its validator.
fn wrap_key(
    level: SecurityLevel,
    material: &[u8],
    master_password: &str,
    iterations: u32,
) -> Result<WrappedKey> {
    let salt = codec::random_salt();
    let (key, iv) = codec::derive_key(master_password.as_bytes(), &salt, iterations);
    let data = codec::encode_salted(&salt, &codec::aes_cbc_encrypt(&key, &iv, material)?);

    let vsalt = codec::random_salt();
    let (vkey, viv) = codec::openssl_kdf(material, &vsalt);
    let validation = codec::encode_salted(&vsalt, &codec::aes_cbc_encrypt(&vkey, &viv, material)?);

    Ok(WrappedKey {
        level,
        identifier: random_identifier(),
        iterations,
        data,
        validation,
    })
}

/// 32 uppercase hex chars from 16 random bytes, matching the identifier
/// style of vaults written by the original applications.
fn random_identifier() -> String {
    let mut raw = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    raw.iter().map(|b| format!("{b:02X}")).collect()
}
