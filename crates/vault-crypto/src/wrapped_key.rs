//! Per-record wrapped keys: a fresh random 64-byte data key, sealed under
//! the master key via small-data encryption, stored alongside the record
//! it protects.

use rand_core::{OsRng, RngCore};
use std::io::{Read, Write};

use crate::aead::{self, Version};
use crate::error::{CryptoError, Result};
use crate::keyhygiene::{ExposedKey, KEY_LEN};

/// Fixed ciphertext length for a wrapped key, by master-key version.
pub fn wrapped_len(version: Version) -> usize {
    match version {
        Version::V1 => 129,
        Version::V2 => 105,
    }
}

/// Generate a fresh random 64-byte data key and seal it under `master`.
/// Returns `(clear_key, wrapped_bytes)`.
pub fn generate_and_wrap(master: &ExposedKey, version: Version) -> Result<([u8; KEY_LEN], Vec<u8>)> {
    let mut clear = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut clear);
    let wrapped = aead::encrypt(version, master.as_ref(), &clear)?;
    debug_assert_eq!(wrapped.len(), wrapped_len(version));
    Ok((clear, wrapped))
}

/// Unwrap a previously-wrapped data key.
pub fn unwrap(master: &ExposedKey, wrapped: &[u8]) -> Result<[u8; KEY_LEN]> {
    let clear = aead::decrypt(master.as_ref(), wrapped)?;
    if clear.len() != KEY_LEN {
        return Err(CryptoError::DecryptFailed);
    }
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(&clear);
    Ok(out)
}

/// Write a wrapped key to a byte stream (`WriteEncryptedKey`).
pub fn write_encrypted_key<W: Write>(mut w: W, wrapped: &[u8]) -> Result<()> {
    w.write_all(wrapped)?;
    Ok(())
}

/// Read a wrapped key of the expected fixed length from a byte stream
/// (`ReadEncryptedKey`).
pub fn read_encrypted_key<R: Read>(mut r: R, version: Version) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; wrapped_len(version)];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
