//! Root facade crate: wires `vault-crypto`, `vault-storage`,
//! `vault-wire`, `vault-model`, `vault-remote`, and `vault-sync` into the
//! programmatic entry points a CLI/TUI/FUSE adapter would call —
//! `create_account`, `login`, `logout`, `status`, `backup_phrase`,
//! `delete_account`, `wipe_account`, `pull`, `sync`, `free`,
//! `add_albums`, `remove_albums`, `rename_album`, `list_files`, `copy`,
//! `move`, `delete`, `cat`, `export`, `import`, `share`, `unshare`,
//! `leave`, `remove_members`, `change_permissions`, `contacts`,
//! `get_updates` — one convenience surface over the whole stack.

mod account;
mod albums;
pub mod config;
pub mod error;
mod files;
mod session;
mod sync_ops;

pub use config::VaultConfig;
pub use error::{Result, VaultError};

pub use vault_model::{GlobEntry, GlobOptions};
pub use vault_remote::RemoteApi;
pub use vault_sync::{BlobSource, ExecutionReport};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use vault_model::{AlbumList, FileSet, Namespace, SetKey};
use vault_storage::{FsRecordBackend, RecordBackend, Storage};

use session::VaultState;

/// Logical record name the account's cached contact list is stored under.
const CONTACTS_RECORD: &str = "account/contacts";
/// Logical record name the decrypted album list is stored under.
const ALBUM_LIST_RECORD: &str = "account/album_list";

/// A single open vault: one data directory, one remote, at most one
/// logged-in session at a time.
pub struct Vault {
    storage: Storage,
    remote: Arc<dyn RemoteApi>,
    config: VaultConfig,
    state: RwLock<VaultState>,
    _lock_reaper: tokio::task::JoinHandle<()>,
}

/// A snapshot of whether the vault currently has an active session.
#[derive(Clone, Debug, Default)]
pub struct VaultStatus {
    pub logged_in: bool,
    pub email: Option<String>,
    pub user_id: Option<u64>,
}

impl Vault {
    /// Open storage at `config.data_dir`, running pending-ops recovery
    /// and spawning the stale-lock reaper, against `remote`.
    #[tracing::instrument(skip(remote), fields(data_dir = %config.data_dir.display()))]
    pub async fn open(config: VaultConfig, remote: Arc<dyn RemoteApi>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(config.blob_dir())?;
        let backend: Arc<dyn RecordBackend> = Arc::new(FsRecordBackend::new(config.data_dir.clone()));
        let storage = Storage::open(backend).await?;
        let reaper = storage.spawn_lock_reaper(config.lock_reap_interval);
        Ok(Vault { storage, remote, config, state: RwLock::new(VaultState::default()), _lock_reaper: reaper })
    }

    /// Build a vault directly over an already-constructed [`Storage`],
    /// for callers (tests) that want an in-memory backend.
    pub async fn with_storage(config: VaultConfig, remote: Arc<dyn RemoteApi>, storage: Storage) -> Result<Self> {
        let reaper = storage.spawn_lock_reaper(config.lock_reap_interval);
        Ok(Vault { storage, remote, config, state: RwLock::new(VaultState::default()), _lock_reaper: reaper })
    }

    pub async fn status(&self) -> VaultStatus {
        let state = self.state.read().await;
        match &state.account {
            Some(account) => {
                VaultStatus { logged_in: true, email: Some(account.email.clone()), user_id: Some(account.user_id) }
            }
            None => VaultStatus::default(),
        }
    }

    /// Persist the in-memory album list and every known file set back to
    /// storage in one transaction.
    pub(crate) async fn persist_state(&self) -> Result<()> {
        let state = self.state.read().await;
        let master = state.master()?.unmask();
        let secret_bytes = match &state.account {
            Some(account) => account.secret_key.to_vec(),
            None => self.config.local_secret_key.clone(),
        };
        let secret_key = if state.account.is_some() {
            vault_storage::paths::ActiveSecretKey::Account(&secret_bytes)
        } else {
            vault_storage::paths::ActiveSecretKey::PreLogin(&secret_bytes)
        };

        let mut names: Vec<String> = vec![ALBUM_LIST_RECORD.to_string(), CONTACTS_RECORD.to_string()];
        for key in state.file_sets.keys() {
            names.push(key.record_name());
        }

        let mut txn = self
            .storage
            .open_typed_transaction(&master, &secret_key, &names, self.config.crypto_version)
            .await?;
        txn.stage_json(ALBUM_LIST_RECORD, &state.album_list)?;
        txn.stage_json(CONTACTS_RECORD, &state.contacts)?;
        for (key, set) in &state.file_sets {
            txn.stage_json(&key.record_name(), set)?;
        }
        txn.commit(true).await?;
        Ok(())
    }

    /// Load the album list, the file sets it references, and the cached
    /// contact list from storage, under whichever secret key is currently
    /// active.
    pub(crate) async fn load_state(
        &self,
    ) -> Result<(AlbumList, HashMap<SetKey, FileSet>, HashMap<String, vault_model::Contact>)> {
        let state = self.state.read().await;
        let master = state.master()?.unmask();
        let secret_bytes = match &state.account {
            Some(account) => account.secret_key.to_vec(),
            None => self.config.local_secret_key.clone(),
        };
        let secret_key = if state.account.is_some() {
            vault_storage::paths::ActiveSecretKey::Account(&secret_bytes)
        } else {
            vault_storage::paths::ActiveSecretKey::PreLogin(&secret_bytes)
        };
        drop(state);

        let list_names = vec![ALBUM_LIST_RECORD.to_string(), CONTACTS_RECORD.to_string()];
        let list_txn = self
            .storage
            .open_typed_transaction(&master, &secret_key, &list_names, self.config.crypto_version)
            .await?;
        let album_list: AlbumList = list_txn.read_json(ALBUM_LIST_RECORD)?.unwrap_or_default();
        let contacts: HashMap<String, vault_model::Contact> =
            list_txn.read_json(CONTACTS_RECORD)?.unwrap_or_default();
        list_txn.commit(false).await?;

        let mut set_names: Vec<String> = vec![SetKey::Gallery.record_name(), SetKey::Trash.record_name()];
        for id in album_list.local.keys() {
            set_names.push(SetKey::Album(id.clone()).record_name());
        }
        let sets_txn = self
            .storage
            .open_typed_transaction(&master, &secret_key, &set_names, self.config.crypto_version)
            .await?;
        let mut file_sets = HashMap::new();
        file_sets.insert(SetKey::Gallery, sets_txn.read_json(&SetKey::Gallery.record_name())?.unwrap_or_default());
        file_sets.insert(SetKey::Trash, sets_txn.read_json(&SetKey::Trash.record_name())?.unwrap_or_default());
        for id in album_list.local.keys() {
            let key = SetKey::Album(id.clone());
            let set = sets_txn.read_json(&key.record_name())?.unwrap_or_default();
            file_sets.insert(key, set);
        }
        sets_txn.commit(false).await?;

        Ok((album_list, file_sets, contacts))
    }

    /// The 32-byte secret key that owns a given file set: the account's
    /// own secret for gallery/trash, or the album's own secret
    /// (recovered by opening the album's `enc_private_key`) for an
    /// album-owned set.
    pub(crate) async fn secret_for_set(&self, key: &SetKey) -> Result<[u8; 32]> {
        let state = self.state.read().await;
        let account = state.account()?;
        match key {
            SetKey::Gallery | SetKey::Trash => Ok(account.secret_key),
            SetKey::Album(id) => {
                let album = state
                    .album_list
                    .local
                    .get(id)
                    .ok_or_else(|| vault_model::ModelError::NotFound(format!("album {id}")))?;
                albums::open_album_secret(&account.secret_key, account.user_id, album)
            }
        }
    }

    /// The 32-byte public key new files/metadata in a set should be
    /// sealed under.
    pub(crate) async fn public_for_set(&self, key: &SetKey) -> Result<[u8; 32]> {
        let state = self.state.read().await;
        let account = state.account()?;
        match key {
            SetKey::Gallery | SetKey::Trash => Ok(account.public_key),
            SetKey::Album(id) => {
                let album = state
                    .album_list
                    .local
                    .get(id)
                    .ok_or_else(|| vault_model::ModelError::NotFound(format!("album {id}")))?;
                let bytes: [u8; 32] = album
                    .public_key
                    .clone()
                    .try_into()
                    .map_err(|_| vault_model::ModelError::ValidationError("malformed album public key".into()))?;
                Ok(bytes)
            }
        }
    }

    /// Build the current virtual namespace plus a
    /// `file_id -> (full_path, owning SetKey)` index, by opening every
    /// local album's metadata and every file's header.
    pub(crate) async fn build_namespace(&self) -> Result<(Namespace, HashMap<String, (String, SetKey)>)> {
        let state = self.state.read().await;
        let account = state.account()?;

        let mut views = Vec::new();
        let mut album_secrets: HashMap<String, [u8; 32]> = HashMap::new();
        for (id, album) in &state.album_list.local {
            let secret = albums::open_album_secret(&account.secret_key, account.user_id, album)?;
            let name = vault_wire::album_meta::open(&secret, &album.metadata)?.name;
            views.push(vault_model::AlbumView {
                album_id: id.clone(),
                decrypted_name: name,
                is_owner: album.is_owner,
                is_shared: album.is_shared,
            });
            album_secrets.insert(id.clone(), secret);
        }

        let mut ns = vault_model::namespace::build(&views, &state.file_sets);
        let mut index = HashMap::new();

        for (set_key, dir_path) in [
            (SetKey::Gallery, vault_model::namespace::GALLERY.to_string()),
            (SetKey::Trash, vault_model::namespace::TRASH.to_string()),
        ] {
            self.index_set(&state, &set_key, &dir_path, account.secret_key, &mut ns, &mut index)?;
        }
        for (id, secret) in &album_secrets {
            if let Some(dir_path) = ns.album_path_to_id.iter().find(|(_, v)| *v == id).map(|(k, _)| k.clone()) {
                self.index_set(&state, &SetKey::Album(id.clone()), &dir_path, *secret, &mut ns, &mut index)?;
            }
        }

        Ok((ns, index))
    }

    fn index_set(
        &self,
        state: &VaultState,
        key: &SetKey,
        dir_path: &str,
        secret: [u8; 32],
        ns: &mut Namespace,
        index: &mut HashMap<String, (String, SetKey)>,
    ) -> Result<()> {
        let Some(set) = state.file_sets.get(key) else { return Ok(()) };
        let mut seen = std::collections::HashSet::new();
        for entry in set.local.values().chain(set.remote.values()) {
            if !seen.insert(entry.file.clone()) {
                continue;
            }
            let pair = vault_wire::file_header::open_pair(&secret, &entry.headers)?;
            let sanitized = vault_model::sanitize::sanitize_name(&pair.main.filename);
            let full_path = vault_model::namespace::insert_file(ns, dir_path, &entry.file, &sanitized);
            index.insert(entry.file.clone(), (full_path, key.clone()));
        }
        Ok(())
    }
}
