//! Root error type: wraps every crate-specific error with `#[from]`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error(transparent)]
    Crypto(#[from] vault_crypto::CryptoError),

    #[error(transparent)]
    Storage(#[from] vault_storage::StorageError),

    #[error(transparent)]
    Wire(#[from] vault_wire::WireError),

    #[error(transparent)]
    Model(#[from] vault_model::ModelError),

    #[error(transparent)]
    Remote(#[from] vault_remote::RemoteError),

    #[error(transparent)]
    Sync(#[from] vault_sync::SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("an account already exists at this data directory")]
    AlreadyInitialized,

    #[error("no local identity found at this data directory")]
    NotInitialized,

    #[error("invalid request: {0}")]
    InvalidArgument(String),
}
