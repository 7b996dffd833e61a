//! Authenticated public-key encryption ("sealed box"): ephemeral X25519 key
//! agreement followed by XChaCha20-Poly1305, used throughout for
//! album metadata, file headers, key bundles, and login challenges.
//!
//! Ephemeral X25519 keypair, Diffie-Hellman, derive a symmetric key from
//! the shared secret, then AEAD-seal. The derived key depends on a
//! caller-supplied domain `context` string, keeping unrelated sealed-box
//! uses (album metadata vs. file headers vs. challenges) from ever
//! sharing a derived key even under key reuse.

use chacha20poly1305::{
    aead::{Aead as _, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hmac::{Hmac, Mac};
use rand_core::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{Result, WireError};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SECRET_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;

/// An X25519 keypair used on either end of a sealed box.
pub struct KeyPair {
    pub secret: [u8; SECRET_KEY_LEN],
    pub public: [u8; PUBLIC_KEY_LEN],
}

pub fn generate_keypair() -> KeyPair {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    KeyPair { secret: secret.to_bytes(), public: *public.as_bytes() }
}

pub fn public_from_secret(secret: &[u8; SECRET_KEY_LEN]) -> [u8; PUBLIC_KEY_LEN] {
    let secret = StaticSecret::from(*secret);
    *PublicKey::from(&secret).as_bytes()
}

fn derive_key(shared_secret: &[u8; 32], context: &str) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(shared_secret).expect("HMAC accepts any key length");
    mac.update(context.as_bytes());
    let out = mac.finalize().into_bytes();
    let mut key = [0u8; 32];
    key.copy_from_slice(&out);
    key
}

/// `ephemeral_public (32) || nonce (24) || ciphertext+tag`.
pub fn seal(recipient_public: &[u8; PUBLIC_KEY_LEN], context: &str, plaintext: &[u8]) -> Vec<u8> {
    let ephemeral_secret = StaticSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let recipient = PublicKey::from(*recipient_public);
    let shared = ephemeral_secret.diffie_hellman(&recipient);
    let key = derive_key(shared.as_bytes(), context);

    let cipher = XChaCha20Poly1305::new((&key).into());
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);
    let ciphertext = cipher.encrypt(nonce, plaintext).expect("sealing into a Vec cannot fail");

    let mut out = Vec::with_capacity(PUBLIC_KEY_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    out
}

/// Open a sealed box with the recipient's own secret key.
pub fn open(recipient_secret: &[u8; SECRET_KEY_LEN], context: &str, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < PUBLIC_KEY_LEN + NONCE_LEN {
        return Err(WireError::MalformedSealedBox("too short".into()));
    }
    let ephemeral_public: [u8; PUBLIC_KEY_LEN] = sealed[..PUBLIC_KEY_LEN].try_into().unwrap();
    let nonce_bytes = &sealed[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + NONCE_LEN];
    let ciphertext = &sealed[PUBLIC_KEY_LEN + NONCE_LEN..];

    let secret = StaticSecret::from(*recipient_secret);
    let shared = secret.diffie_hellman(&PublicKey::from(ephemeral_public));
    let key = derive_key(shared.as_bytes(), context);

    let cipher = XChaCha20Poly1305::new((&key).into());
    let nonce = XNonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).map_err(|_| WireError::SealOpenFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let kp = generate_keypair();
        let sealed = seal(&kp.public, "album-meta", b"hello album");
        let opened = open(&kp.secret, "album-meta", &sealed).unwrap();
        assert_eq!(opened, b"hello album");
    }

    #[test]
    fn wrong_secret_fails() {
        let kp = generate_keypair();
        let other = generate_keypair();
        let sealed = seal(&kp.public, "album-meta", b"hello");
        assert!(open(&other.secret, "album-meta", &sealed).is_err());
    }

    #[test]
    fn mismatched_context_fails() {
        let kp = generate_keypair();
        let sealed = seal(&kp.public, "album-meta", b"hello");
        assert!(open(&kp.secret, "file-header", &sealed).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let kp = generate_keypair();
        let mut sealed = seal(&kp.public, "ctx", b"hello");
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(&kp.secret, "ctx", &sealed).is_err());
    }
}
