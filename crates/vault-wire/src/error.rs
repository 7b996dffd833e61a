use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("sealed box open failed")]
    SealOpenFailed,
    #[error("malformed sealed box: {0}")]
    MalformedSealedBox(String),
    #[error("malformed file header: {0}")]
    MalformedHeader(String),
    #[error("unknown file type tag {0}")]
    UnknownFileType(u8),
    #[error("malformed key bundle: {0}")]
    MalformedKeyBundle(String),
    #[error("invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),
    #[error("challenge response did not prove key possession")]
    ChallengeFailed,
    #[error(transparent)]
    Crypto(#[from] vault_crypto::CryptoError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
