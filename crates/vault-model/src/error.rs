//! Data-model error types: the semantic errors raised by album/file
//! mutations, layered over storage and wire failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not empty: {0}")]
    NotEmpty(String),

    #[error("invalid name or pattern: {0}")]
    ValidationError(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Storage(#[from] vault_storage::StorageError),

    #[error(transparent)]
    Wire(#[from] vault_wire::WireError),

    #[error(transparent)]
    Crypto(#[from] vault_crypto::CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
