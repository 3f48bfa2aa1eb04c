//! Item payload encryption.
//!
//! Each item's content is encrypted independently: a fresh 8-byte salt is
//! expanded with the OpenSSL KDF against the level key, and the plaintext
//! goes through AES-128-CBC.  The result is a base64 `Salted__` blob, the
//! same framing used for the wrapped keys themselves.

use zeroize::Zeroizing;

use crate::crypto::codec;
use crate::errors::Result;

/// Encrypt a plaintext payload under a security-level key.
pub fn encrypt_payload(level_key: &[u8], plaintext: &[u8]) -> Result<String> {
    let salt = codec::random_salt();
    let (key, iv) = codec::openssl_kdf(level_key, &salt);
    let ciphertext = codec::aes_cbc_encrypt(&key, &iv, plaintext)?;
    Ok(codec::encode_salted(&salt, &ciphertext))
}

/// Decrypt a payload blob produced by [`encrypt_payload`].
///
/// Truncated blobs surface as `CorruptVault`; a padding failure (wrong key)
/// as `DecryptError`.
pub fn decrypt_payload(level_key: &[u8], blob: &str) -> Result<Zeroizing<Vec<u8>>> {
    let (salt, ciphertext) = codec::decode_salted(blob)?;
    let (key, iv) = codec::openssl_kdf(level_key, &salt);
    Ok(Zeroizing::new(codec::aes_cbc_decrypt(&key, &iv, &ciphertext)?))
}
