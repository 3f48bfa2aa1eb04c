//! Low-level primitives for the Agile Keychain format.
//!
//! The format fixes the exact algorithms: PBKDF2-HMAC-SHA1 for the master
//! key, OpenSSL's `EVP_BytesToKey` (MD5, one round) for payload keys, and
//! AES-128-CBC with PKCS#7 padding for every ciphertext.  Each blob on disk
//! is framed as `base64("Salted__" || salt(8) || ciphertext)`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::{Digest, Md5};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha1::Sha1;

use crate::errors::{Result, VaultError};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Magic prefix of every encrypted blob (OpenSSL `enc` convention).
const SALTED_MAGIC: &[u8; 8] = b"Salted__";

/// Length of the random salt embedded after the magic.
pub const SALT_LEN: usize = 8;

/// AES-128 key and IV length.
pub const KEY_LEN: usize = 16;

/// Derive an AES key and IV from a master password.
///
/// PBKDF2-HMAC-SHA1 with 32 bytes of output, split into a 16-byte key and
/// a 16-byte IV.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> ([u8; KEY_LEN], [u8; KEY_LEN]) {
    let mut out = [0u8; 2 * KEY_LEN];
    pbkdf2_hmac::<Sha1>(password, salt, iterations, &mut out);

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; KEY_LEN];
    key.copy_from_slice(&out[..KEY_LEN]);
    iv.copy_from_slice(&out[KEY_LEN..]);
    (key, iv)
}

/// OpenSSL `EVP_BytesToKey`-compatible expansion (MD5, one round).
///
/// Produces the key and IV used for item payloads and for the wrapped-key
/// validator: `D1 = MD5(data || salt)`, `D2 = MD5(D1 || data || salt)`.
pub fn openssl_kdf(key_material: &[u8], salt: &[u8]) -> ([u8; KEY_LEN], [u8; KEY_LEN]) {
    let mut h = Md5::new();
    h.update(key_material);
    h.update(salt);
    let d1 = h.finalize();

    let mut h = Md5::new();
    h.update(&d1);
    h.update(key_material);
    h.update(salt);
    let d2 = h.finalize();

    (d1.into(), d2.into())
}

/// Encrypt with AES-128-CBC and PKCS#7 padding.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let enc = Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|e| VaultError::EncryptError(format!("invalid key/iv length: {e}")))?;
    Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt AES-128-CBC with PKCS#7 padding.
///
/// A padding failure almost always means the wrong key, so it surfaces as
/// `DecryptError` rather than a format error.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let dec = Aes128CbcDec::new_from_slices(key, iv).map_err(|_| VaultError::DecryptError)?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| VaultError::DecryptError)
}

/// Generate a random 8-byte blob salt.
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Frame a salt and ciphertext as a base64 `Salted__` blob.
pub fn encode_salted(salt: &[u8; SALT_LEN], ciphertext: &[u8]) -> String {
    let mut raw = Vec::with_capacity(SALTED_MAGIC.len() + SALT_LEN + ciphertext.len());
    raw.extend_from_slice(SALTED_MAGIC);
    raw.extend_from_slice(salt);
    raw.extend_from_slice(ciphertext);
    BASE64.encode(raw)
}

/// Split a base64 `Salted__` blob back into its salt and ciphertext.
///
/// Rejects blobs whose decoded length is under 16 bytes or whose first
/// 8 bytes are not the magic.
pub fn decode_salted(blob: &str) -> Result<([u8; SALT_LEN], Vec<u8>)> {
    let raw = BASE64
        .decode(blob.trim_end_matches('\0'))
        .map_err(|e| VaultError::CorruptVault(format!("bad base64 in encrypted blob: {e}")))?;

    if raw.len() < SALTED_MAGIC.len() + SALT_LEN {
        return Err(VaultError::CorruptVault(
            "encrypted blob too short to hold a salt".into(),
        ));
    }
    if &raw[..SALTED_MAGIC.len()] != SALTED_MAGIC {
        return Err(VaultError::CorruptVault(
            "encrypted blob missing Salted__ prefix".into(),
        ));
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&raw[SALTED_MAGIC.len()..SALTED_MAGIC.len() + SALT_LEN]);
    Ok((salt, raw[SALTED_MAGIC.len() + SALT_LEN..].to_vec()))
}
