//! Typed convenience layer over [`crate::txn::Transaction`] for callers
//! (chiefly `vault-model`) that want to read/stage JSON-codec records by
//! logical name without re-deriving the record framing at every call
//! site.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use vault_crypto::aead::Version as CryptoVersion;
use vault_crypto::ExposedKey;

use crate::error::{Result, StorageError};
use crate::record::{self, Codec, Flag};
use crate::txn::Transaction;

/// A multi-record transaction keyed by the caller's logical names rather
/// than their hashed on-disk paths.
pub struct TypedTransaction<'a> {
    inner: Transaction<'a>,
    master: &'a ExposedKey,
    version: CryptoVersion,
    path_of: HashMap<String, String>,
}

impl<'a> TypedTransaction<'a> {
    pub(crate) fn new(
        inner: Transaction<'a>,
        master: &'a ExposedKey,
        version: CryptoVersion,
        path_of: HashMap<String, String>,
    ) -> Self {
        TypedTransaction { inner, master, version, path_of }
    }

    fn path(&self, logical_name: &str) -> Result<&str> {
        self.path_of
            .get(logical_name)
            .map(|s| s.as_str())
            .ok_or_else(|| StorageError::NotFound(logical_name.to_string()))
    }

    /// Read and JSON-decode `logical_name`, or `None` if it didn't exist
    /// at transaction-open time.
    pub fn read_json<T: DeserializeOwned>(&self, logical_name: &str) -> Result<Option<T>> {
        let path = self.path(logical_name)?;
        let Some(raw) = self.inner.read(path) else {
            return Ok(None);
        };
        let (_, payload) = record::decode(raw, Some((self.master, logical_name, self.version)))?;
        let value = serde_json::from_slice(&payload).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Some(value))
    }

    /// JSON-encode and stage `value` to be written to `logical_name` if
    /// the transaction commits.
    pub fn stage_json<T: Serialize>(&mut self, logical_name: &str, value: &T) -> Result<()> {
        let path = self.path(logical_name)?.to_string();
        let payload = serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let flag = Flag { codec: Codec::Json, encrypted: true, compressed: false };
        let encoded = record::encode(flag, &payload, Some((self.master, logical_name, self.version)))?;
        self.inner.stage(path, encoded);
        Ok(())
    }

    pub async fn commit(self, commit: bool) -> Result<()> {
        self.inner.commit(commit).await
    }
}
