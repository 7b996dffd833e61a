//! Vault configuration: plain data, serde-deserializable, with a sane
//! `Default`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vault_crypto::aead::Version as CryptoVersion;

/// Configuration for an open [`crate::Vault`].
#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Root directory holding `master.key`, hashed records, and blobs.
    pub data_dir: PathBuf,
    /// Which AEAD family new master keys and new blobs are sealed with.
    /// Production code should set this from [`vault_crypto::bench::select_fastest`]
    /// once at startup; left explicit here so callers can pin it.
    pub crypto_version: CryptoVersion,
    /// The local, pre-login path-hashing secret: before login,
    /// `secret_key_bytes` comes from local configuration. Only used to
    /// locate the bootstrap `account/keys` record before a session
    /// establishes the account's own secret key.
    pub local_secret_key: Vec<u8>,
    /// How often the background stale-lock reaper sweeps.
    pub lock_reap_interval: Duration,
    /// Use drastically reduced KDF/PBKDF2 cost parameters. Never set this
    /// outside of tests.
    pub test_mode: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        VaultConfig {
            data_dir: PathBuf::from("."),
            crypto_version: CryptoVersion::V2,
            local_secret_key: b"vault-local-bootstrap".to_vec(),
            lock_reap_interval: Duration::from_secs(30),
            test_mode: false,
        }
    }
}

impl VaultConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        VaultConfig { data_dir: data_dir.into(), ..Default::default() }
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
