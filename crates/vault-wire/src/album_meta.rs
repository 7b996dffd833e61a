//! Album metadata: a short tagged structure holding the album name,
//! sealed under the album's own public key.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sealed_box::{self, PUBLIC_KEY_LEN, SECRET_KEY_LEN};

const CONTEXT: &str = "album-metadata";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlbumMetadata {
    pub name: String,
}

pub fn seal(public_key: &[u8; PUBLIC_KEY_LEN], metadata: &AlbumMetadata) -> Vec<u8> {
    let plaintext = serde_json::to_vec(metadata).expect("AlbumMetadata serializes infallibly");
    sealed_box::seal(public_key, CONTEXT, &plaintext)
}

pub fn open(secret_key: &[u8; SECRET_KEY_LEN], sealed: &[u8]) -> Result<AlbumMetadata> {
    let plaintext = sealed_box::open(secret_key, CONTEXT, sealed)?;
    Ok(serde_json::from_slice(&plaintext)?)
}
