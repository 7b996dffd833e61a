//! Master-key lifecycle, small-data authenticated encryption, per-record
//! wrapped keys, and streaming chunked AEAD for blob payloads.
//!
//! Two algorithm families are supported end to end, selected by a version
//! byte carried alongside every encrypted artifact: v1 (PBKDF2-SHA256 +
//! AES-256 family) and v2 (Argon2id + XChaCha20-Poly1305 family). See
//! [`bench::select_fastest`] for the startup algorithm choice.

pub mod aead;
pub mod bench;
pub mod error;
pub mod hashing;
pub mod keyhygiene;
pub mod masterkey;
pub mod streaming;
pub mod wrapped_key;

pub use aead::Version;
pub use error::{CryptoError, Result};
pub use keyhygiene::{ExposedKey, MaskedKey, KEY_LEN};
