//! Crypto error types.

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors surfaced by `vault-crypto`.
///
/// `DecryptFailed` is intentionally opaque: it never distinguishes a bad
/// key, a bad MAC, a truncated stream, or a framing mismatch, so a caller
/// (or an attacker probing error messages) cannot use it as an oracle.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Authenticated decryption failed for any reason.
    #[error("decryption failed")]
    DecryptFailed,

    /// The master key file's version byte is not one this build supports.
    #[error("unsupported master key version: {0}")]
    UnsupportedVersion(u8),

    /// The master key file is shorter than its declared layout requires.
    #[error("malformed master key data")]
    MalformedKey,

    /// A wrapped-key blob was not the fixed size its version mandates.
    #[error("malformed wrapped key")]
    MalformedWrappedKey,

    /// Passphrase-derivation cost parameters were out of range.
    #[error("invalid key derivation parameters: {0}")]
    InvalidKdfParams(String),

    /// I/O error while reading/writing key material or stream chunks.
    #[error("crypto I/O error: {0}")]
    Io(#[from] std::io::Error),
}
