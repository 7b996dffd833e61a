//! Transactional, crash-safe, encrypted record storage plus streaming
//! blob I/O, keyed by caller-supplied names.

pub mod atomic;
pub mod backend;
pub mod blob;
pub mod error;
pub mod lock;
pub mod paths;
pub mod record;
pub mod txn;
pub mod typed;

pub use backend::{FsRecordBackend, MemoryRecordBackend, RecordBackend};
pub use error::{Result, StorageError};
pub use txn::Transaction;
pub use typed::TypedTransaction;

use std::sync::Arc;
use vault_crypto::aead::Version as CryptoVersion;
use vault_crypto::ExposedKey;

use paths::ActiveSecretKey;

/// Top-level storage façade: owns the backend and drives startup recovery
/// plus the background lock reaper.
pub struct Storage {
    backend: Arc<dyn RecordBackend>,
}

impl Storage {
    /// Open storage against `backend`. The pending-ops manifest is an
    /// encrypted record (spec §4.2/§9), so a manifest left behind by a
    /// crashed, logged-in session can't be decoded yet — this best-effort
    /// pass only clears manifests that happen to already be readable
    /// (none, on a fresh format); callers must call
    /// [`Storage::recover_pending_with_key`] once the master key is
    /// unlocked to actually restore any backups it names.
    pub async fn open(backend: Arc<dyn RecordBackend>) -> Result<Self> {
        let recovered = txn::recover_pending(backend.as_ref(), None).await?;
        if recovered > 0 {
            tracing::info!(recovered, "restored pending transactions on startup");
        }
        Ok(Storage { backend })
    }

    /// Re-run pending-ops recovery now that the master key is available
    /// (called once a passphrase has unlocked it, e.g. from `login`/
    /// `create_account`), sealing/unsealing the manifest under `master`.
    pub async fn recover_pending_with_key(&self, master: &ExposedKey, version: CryptoVersion) -> Result<usize> {
        let recovered = txn::recover_pending(self.backend.as_ref(), Some((master, version))).await?;
        if recovered > 0 {
            tracing::info!(recovered, "restored pending transactions after unlocking master key");
        }
        Ok(recovered)
    }

    pub fn backend(&self) -> &dyn RecordBackend {
        self.backend.as_ref()
    }

    /// Spawn the background stale-lock reaper on the current Tokio
    /// runtime. Returns a handle the caller may abort on shutdown.
    pub fn spawn_lock_reaper(&self, sweep_interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            let reaper = lock::StaleLockReaper::new();
            loop {
                tokio::time::sleep(sweep_interval).await;
                if let Err(e) = reaper.sweep(backend.as_ref(), "").await {
                    tracing::warn!(error = %e, "lock reaper sweep failed");
                }
            }
        })
    }

    /// Read a single record by logical name, decrypting if present.
    pub async fn read_record(
        &self,
        master: &ExposedKey,
        secret_key: &ActiveSecretKey<'_>,
        name: &str,
        version: CryptoVersion,
        encrypted: bool,
    ) -> Result<(record::Flag, Vec<u8>)> {
        let path = paths::record_path(master, secret_key, name);
        let raw = self.backend.read(&path).await?;
        let key_for_decrypt = if encrypted { Some((master, name, version)) } else { None };
        record::decode(&raw, key_for_decrypt)
    }

    /// Atomically write a single record by logical name.
    pub async fn save_record(
        &self,
        master: &ExposedKey,
        secret_key: &ActiveSecretKey<'_>,
        name: &str,
        flag: record::Flag,
        payload: &[u8],
        version: CryptoVersion,
    ) -> Result<()> {
        let path = paths::record_path(master, secret_key, name);
        let key_for_encrypt = if flag.encrypted { Some((master, name, version)) } else { None };
        let encoded = record::encode(flag, payload, key_for_encrypt)?;
        atomic::save(self.backend.as_ref(), &path, &encoded).await
    }

    /// Open a multi-file transaction over the on-disk paths for
    /// `logical_names`.
    pub async fn open_transaction(
        &self,
        master: &ExposedKey,
        secret_key: &ActiveSecretKey<'_>,
        logical_names: &[String],
        version: CryptoVersion,
    ) -> Result<(Transaction<'_>, Vec<String>)> {
        let paths: Vec<String> = logical_names
            .iter()
            .map(|n| paths::record_path(master, secret_key, n))
            .collect();
        let txn = Transaction::open(self.backend.as_ref(), &paths, Some((master, version))).await?;
        Ok((txn, paths))
    }

    /// Open a multi-record transaction addressed by logical name, with
    /// JSON read/stage helpers keyed the same way (see [`TypedTransaction`]).
    pub async fn open_typed_transaction<'a>(
        &'a self,
        master: &'a ExposedKey,
        secret_key: &ActiveSecretKey<'_>,
        logical_names: &[String],
        version: CryptoVersion,
    ) -> Result<TypedTransaction<'a>> {
        let mut path_of = std::collections::HashMap::new();
        let mut paths = Vec::with_capacity(logical_names.len());
        for name in logical_names {
            let path = paths::record_path(master, secret_key, name);
            path_of.insert(name.clone(), path.clone());
            paths.push(path);
        }
        let txn = Transaction::open(self.backend.as_ref(), &paths, Some((master, version))).await?;
        Ok(TypedTransaction::new(txn, master, version, path_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vault_crypto::MaskedKey;

    #[tokio::test]
    async fn save_and_read_record_roundtrip() {
        let backend: Arc<dyn RecordBackend> = Arc::new(MemoryRecordBackend::new());
        let storage = Storage::open(backend).await.unwrap();
        let masked = MaskedKey::new([4u8; 64]);
        let key = masked.unmask();
        let sk = ActiveSecretKey::Account(b"acct");

        let flag = record::Flag { codec: record::Codec::Json, encrypted: true, compressed: false };
        storage
            .save_record(&key, &sk, "gallery/album_list", flag, br#"{"a":1}"#, CryptoVersion::V2)
            .await
            .unwrap();

        let (f, payload) = storage
            .read_record(&key, &sk, "gallery/album_list", CryptoVersion::V2, true)
            .await
            .unwrap();
        assert_eq!(f.codec, record::Codec::Json);
        assert_eq!(payload, br#"{"a":1}"#);
    }
}
