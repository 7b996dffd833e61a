use thiserror::Error;

pub type Result<T> = std::result::Result<T, RemoteError>;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// The remote returned `status != "ok"` (RemoteStatusError).
    #[error("remote returned non-ok status: {0:?}")]
    Status(Vec<String>),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Crypto(#[from] vault_crypto::CryptoError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
