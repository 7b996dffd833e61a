//! Storage error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("record framing mismatch (tampered or wrong key): {0}")]
    FramingMismatch(String),

    #[error("crypto failure: {0}")]
    Crypto(#[from] vault_crypto::CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock busy: {0}")]
    LockBusy(String),

    #[error("transaction already committed")]
    AlreadyCommitted,

    #[error("transaction already rolled back")]
    AlreadyRolledBack,

    #[error("transaction rolled back")]
    RolledBack,

    #[error("serialization error: {0}")]
    Serialization(String),
}
