//! Small-data authenticated encryption: `version || iv/nonce || ciphertext || tag`.
//!
//! Two version families, selected by a leading version byte:
//!
//! - v1: AES-256-CBC (PKCS7 padding) + detached HMAC-SHA256 over the
//!   ciphertext (encrypt-then-MAC).
//! - v2: XChaCha20-Poly1305 (AEAD tag is part of the ciphertext).
//!
//! Both take the key's first 32 bytes as the cipher key; v1 additionally
//! takes bytes 32..64 as the HMAC key. A 64-byte input therefore produces
//! deterministic, fixed-size output for a fixed plaintext size — this is
//! what lets wrapped per-record keys (always exactly 64 bytes of
//! plaintext) come out to exactly 129 (v1) or 105 (v2) bytes.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chacha20poly1305::{
    aead::{Aead as _, KeyInit as _, Payload},
    XChaCha20Poly1305, XNonce,
};
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Which version family produced (or should produce) a ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    /// AES-256-CBC + detached HMAC-SHA256.
    V1 = 1,
    /// XChaCha20-Poly1305.
    V2 = 2,
}

impl Version {
    fn from_byte(b: u8) -> Result<Self> {
        match b {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            other => Err(CryptoError::UnsupportedVersion(other)),
        }
    }
}

const IV_LEN_V1: usize = 16;
const NONCE_LEN_V2: usize = 24;
const MAC_LEN: usize = 32;

/// Encrypt `plaintext` under `key` (at least 32 bytes; v1 requires 64).
pub fn encrypt(version: Version, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    match version {
        Version::V1 => encrypt_v1(key, plaintext),
        Version::V2 => encrypt_v2(key, plaintext),
    }
}

/// Decrypt a `version || iv/nonce || ciphertext || tag` blob. Any failure
/// — wrong key, tampering, truncation — returns the single opaque
/// `DecryptFailed` variant.
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let version = *data.first().ok_or(CryptoError::DecryptFailed)?;
    let version = Version::from_byte(version).map_err(|_| CryptoError::DecryptFailed)?;
    match version {
        Version::V1 => decrypt_v1(key, &data[1..]),
        Version::V2 => decrypt_v2(key, &data[1..]),
    }
}

fn encrypt_v1(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if key.len() < 64 {
        return Err(CryptoError::MalformedKey);
    }
    let cipher_key = &key[..32];
    let mac_key = &key[32..64];

    let mut iv = [0u8; IV_LEN_V1];
    OsRng.fill_bytes(&mut iv);

    let enc = Aes256CbcEnc::new(cipher_key.into(), &iv.into());
    let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).expect("any length key");
    mac.update(&iv);
    mac.update(&ciphertext);
    let tag = mac.finalize().into_bytes();

    let mut out = Vec::with_capacity(1 + IV_LEN_V1 + ciphertext.len() + MAC_LEN);
    out.push(Version::V1 as u8);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    Ok(out)
}

fn decrypt_v1(key: &[u8], rest: &[u8]) -> Result<Vec<u8>> {
    if key.len() < 64 || rest.len() < IV_LEN_V1 + MAC_LEN {
        return Err(CryptoError::DecryptFailed);
    }
    let cipher_key = &key[..32];
    let mac_key = &key[32..64];

    let iv = &rest[..IV_LEN_V1];
    let ct_end = rest.len() - MAC_LEN;
    let ciphertext = &rest[IV_LEN_V1..ct_end];
    let tag = &rest[ct_end..];

    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).expect("any length key");
    mac.update(iv);
    mac.update(ciphertext);
    let expected = mac.finalize().into_bytes();
    if expected.ct_eq(tag).unwrap_u8() != 1 {
        return Err(CryptoError::DecryptFailed);
    }

    let dec = Aes256CbcDec::new(cipher_key.into(), iv.into());
    dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptFailed)
}

fn encrypt_v2(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if key.len() < 32 {
        return Err(CryptoError::MalformedKey);
    }
    let cipher = XChaCha20Poly1305::new(key[..32].into());
    let mut nonce_bytes = [0u8; NONCE_LEN_V2];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, Payload::from(plaintext))
        .map_err(|_| CryptoError::DecryptFailed)?;

    let mut out = Vec::with_capacity(1 + NONCE_LEN_V2 + ciphertext.len());
    out.push(Version::V2 as u8);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn decrypt_v2(key: &[u8], rest: &[u8]) -> Result<Vec<u8>> {
    if key.len() < 32 || rest.len() < NONCE_LEN_V2 {
        return Err(CryptoError::DecryptFailed);
    }
    let cipher = XChaCha20Poly1305::new(key[..32].into());
    let nonce = XNonce::from_slice(&rest[..NONCE_LEN_V2]);
    let ciphertext = &rest[NONCE_LEN_V2..];
    cipher
        .decrypt(nonce, Payload::from(ciphertext))
        .map_err(|_| CryptoError::DecryptFailed)
}
