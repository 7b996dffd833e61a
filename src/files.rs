//! File operations over the virtual namespace: `list_files`,
//! `copy`, `move_file`, `delete`, `cat`, `export`, `import`. Paths are
//! resolved through [`crate::Vault::build_namespace`] rather than a
//! single fixed bucket.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use rand_core::{OsRng, RngCore};

use vault_model::mutate::{self, HeaderReencryptor, TransferKeys};
use vault_model::{AlbumList, FileEntry, GlobEntry, GlobOptions, ModelError, Namespace, SetKey};
use vault_wire::file_header;

use crate::error::{Result, VaultError};
use crate::Vault;

fn random_data_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

fn dir_to_set_key(ns: &Namespace, dir_path: &str) -> Result<SetKey> {
    match dir_path {
        vault_model::namespace::GALLERY => Ok(SetKey::Gallery),
        vault_model::namespace::TRASH => Ok(SetKey::Trash),
        other => ns
            .album_path_to_id
            .get(other)
            .cloned()
            .map(SetKey::Album)
            .ok_or_else(|| ModelError::NotFound(format!("directory {other}")).into()),
    }
}

fn path_to_file(index: &HashMap<String, (String, SetKey)>, path: &str) -> Result<(String, SetKey)> {
    index
        .iter()
        .find(|(_, (p, _))| p == path)
        .map(|(id, (_, set))| (id.clone(), set.clone()))
        .ok_or_else(|| ModelError::NotFound(format!("file {path}")).into())
}

/// Which high-level operation a source/destination pair is being
/// validated for — `copy` only needs `AllowCopy` out of a non-owned
/// source album, `move` requires outright ownership of it.
enum TransferMode {
    Copy,
    Move,
}

/// Enforces the copy/move contract from spec §4.4: neither operation may
/// source from or target `.trash` (that's `delete`'s job); a non-owned
/// source album must grant `AllowCopy` (copy) or be owned outright
/// (move); a non-owned destination album must grant `AllowAdd`.
fn validate_transfer(list: &AlbumList, source_set: &SetKey, dest_set: &SetKey, mode: TransferMode) -> Result<()> {
    if matches!(source_set, SetKey::Trash) {
        return Err(ModelError::NotAllowed("source items must not be in trash".into()).into());
    }
    if matches!(dest_set, SetKey::Trash) {
        return Err(ModelError::NotAllowed("trash is not a valid destination".into()).into());
    }

    if let SetKey::Album(id) = source_set {
        let album = list.local.get(id).ok_or_else(|| ModelError::NotFound(format!("album {id}")))?;
        match mode {
            TransferMode::Move => {
                if !album.is_owner {
                    return Err(ModelError::NotAllowed(format!("album {id} is not owned; cannot move its files")).into());
                }
            }
            TransferMode::Copy => {
                if !album.is_owner && !album.permissions.allow_copy {
                    return Err(ModelError::NotAllowed(format!("album {id} does not allow copying out")).into());
                }
            }
        }
    }

    if let SetKey::Album(id) = dest_set {
        let album = list.local.get(id).ok_or_else(|| ModelError::NotFound(format!("album {id}")))?;
        if !album.is_owner && !album.permissions.allow_add {
            return Err(ModelError::NotAllowed(format!("album {id} does not allow adding files")).into());
        }
    }

    Ok(())
}

/// Decrypts under one set's key and re-seals under another's, the only
/// key material a file transfer across sets needs.
struct KeyReencryptor {
    source_secret: [u8; 32],
    dest_public: [u8; 32],
}

impl HeaderReencryptor for KeyReencryptor {
    fn reencrypt(&self, sealed_headers: &[u8], new_filename: Option<&str>) -> vault_model::Result<Vec<u8>> {
        Ok(file_header::reencrypt(&self.source_secret, &self.dest_public, sealed_headers, new_filename)?)
    }
}

impl Vault {
    /// List namespace entries matching `pattern` (glob engine).
    pub async fn list_files(&self, pattern: &str, opts: &GlobOptions) -> Result<Vec<GlobEntry>> {
        let (ns, _) = self.build_namespace().await?;
        Ok(vault_model::glob_match(&ns.entries, pattern, opts))
    }

    /// Copy a file into another directory, keeping its id but
    /// re-encrypting its header pair under the destination's key.
    pub async fn copy(&self, source_path: &str, dest_dir: &str, new_filename: Option<&str>) -> Result<()> {
        let (ns, index) = self.build_namespace().await?;
        let (file_id, source_set) = path_to_file(&index, source_path)?;
        let dest_set = dir_to_set_key(&ns, dest_dir)?;
        if source_set == dest_set {
            return Err(VaultError::InvalidArgument("source and destination are the same location".into()));
        }

        {
            let state = self.state.read().await;
            validate_transfer(&state.album_list, &source_set, &dest_set, TransferMode::Copy)?;
        }

        let source_secret = self.secret_for_set(&source_set).await?;
        let dest_public = self.public_for_set(&dest_set).await?;
        let reencryptor = KeyReencryptor { source_secret, dest_public };
        let keys = TransferKeys { source_key_changes: true, reencryptor: &reencryptor };

        let mut state = self.state.write().await;
        let source_clone = state.file_sets.get(&source_set).cloned().unwrap_or_default();
        let dest_entry = state.file_sets.entry(dest_set.clone()).or_default();
        mutate::copy_file(&source_clone, dest_entry, &file_id, dest_set.album_id().map(String::from), new_filename, &keys)?;
        drop(state);
        self.persist_state().await?;
        Ok(())
    }

    /// Move a file into another directory, or rename it in place if
    /// `dest_dir` names its current directory.
    pub async fn move_file(&self, source_path: &str, dest_dir: &str, new_filename: Option<&str>) -> Result<()> {
        let (ns, index) = self.build_namespace().await?;
        let (file_id, source_set) = path_to_file(&index, source_path)?;
        let dest_set = dir_to_set_key(&ns, dest_dir)?;

        if source_set == dest_set {
            return self.rename_file_in_place(&source_set, &file_id, new_filename).await;
        }

        {
            let state = self.state.read().await;
            validate_transfer(&state.album_list, &source_set, &dest_set, TransferMode::Move)?;
        }

        let source_secret = self.secret_for_set(&source_set).await?;
        let dest_public = self.public_for_set(&dest_set).await?;
        let reencryptor = KeyReencryptor { source_secret, dest_public };
        let keys = TransferKeys { source_key_changes: true, reencryptor: &reencryptor };

        let mut state = self.state.write().await;
        let mut source_val = state.file_sets.remove(&source_set).unwrap_or_default();
        {
            let dest_entry = state.file_sets.entry(dest_set.clone()).or_default();
            mutate::move_file(
                &mut source_val,
                dest_entry,
                &file_id,
                dest_set.album_id().map(String::from),
                new_filename,
                &keys,
            )?;
        }
        state.file_sets.insert(source_set, source_val);
        drop(state);
        self.persist_state().await?;
        Ok(())
    }

    async fn rename_file_in_place(&self, set_key: &SetKey, file_id: &str, new_filename: Option<&str>) -> Result<()> {
        let Some(new_name) = new_filename else { return Ok(()) };
        let secret = self.secret_for_set(set_key).await?;
        let public = self.public_for_set(set_key).await?;

        let mut state = self.state.write().await;
        let set = state.file_sets.get_mut(set_key).ok_or_else(|| ModelError::NotFound(format!("file {file_id}")))?;
        let entry = set.local.get_mut(file_id).ok_or_else(|| ModelError::NotFound(format!("file {file_id}")))?;
        entry.headers = file_header::reencrypt(&secret, &public, &entry.headers, Some(new_name))?;
        entry.date_modified = vault_model::types::now_millis_string();
        drop(state);
        self.persist_state().await?;
        Ok(())
    }

    /// Delete a file: move it to trash, or remove it outright if it's
    /// already there.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let (_, index) = self.build_namespace().await?;
        let (file_id, set_key) = path_to_file(&index, path)?;

        if matches!(set_key, SetKey::Trash) {
            let mut state = self.state.write().await;
            if let Some(set) = state.file_sets.get_mut(&SetKey::Trash) {
                set.local.remove(&file_id);
                set.remote.remove(&file_id);
            }
            drop(state);
            self.persist_state().await?;
            return Ok(());
        }

        let source_secret = self.secret_for_set(&set_key).await?;
        let trash_public = self.public_for_set(&SetKey::Trash).await?;
        let reencryptor = KeyReencryptor { source_secret, dest_public: trash_public };
        let keys = TransferKeys { source_key_changes: true, reencryptor: &reencryptor };

        let mut state = self.state.write().await;
        let mut source_val = state.file_sets.remove(&set_key).unwrap_or_default();
        {
            let trash_entry = state.file_sets.entry(SetKey::Trash).or_default();
            mutate::delete_file(&mut source_val, trash_entry, &file_id, false, &keys)?;
        }
        state.file_sets.insert(set_key, source_val);
        drop(state);
        self.persist_state().await?;
        Ok(())
    }

    /// Stream a file's decrypted body to `dest` (the `cat` entry point).
    pub async fn cat(&self, path: &str, dest: &mut dyn Write) -> Result<()> {
        let (_, index) = self.build_namespace().await?;
        let (file_id, set_key) = path_to_file(&index, path)?;
        let secret = self.secret_for_set(&set_key).await?;

        let entry = {
            let state = self.state.read().await;
            state
                .file_sets
                .get(&set_key)
                .and_then(|s| s.local.get(&file_id).or_else(|| s.remote.get(&file_id)))
                .cloned()
                .ok_or_else(|| ModelError::NotFound(format!("file {file_id}")))?
        };

        let blob_path = self.config.blob_dir().join(&file_id);
        vault_model::import_export::export_file(
            &blob_path,
            &entry.headers,
            &secret,
            self.config.crypto_version,
            &file_id,
            dest,
        )?;
        Ok(())
    }

    /// Decrypt a file's body to `dest_path` on the local filesystem.
    pub async fn export(&self, path: &str, dest_path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(dest_path)?;
        self.cat(path, &mut file).await
    }

    /// Import a local file into `dest_dir`, generating fresh per-file
    /// data keys and sealing its header pair under that directory's key.
    pub async fn import(
        &self,
        source_path: &Path,
        dest_dir: &str,
        thumbnails: &dyn vault_model::import_export::ThumbnailSource,
    ) -> Result<FileEntry> {
        let (ns, _) = self.build_namespace().await?;
        let dest_set = dir_to_set_key(&ns, dest_dir)?;
        let owner_public = self.public_for_set(&dest_set).await?;
        let file_id = vault_model::types::new_file_id();
        let blob_dir = self.config.blob_dir();

        let target = vault_model::import_export::ImportTarget {
            data_key_main: random_data_key(),
            data_key_thumb: random_data_key(),
            owner_public_key: &owner_public,
            blob_dir: &blob_dir,
            version: self.config.crypto_version,
        };
        let entry = vault_model::import_export::import_file(
            source_path,
            &file_id,
            dest_set.album_id().map(String::from),
            &target,
            thumbnails,
        )?;

        let mut state = self.state.write().await;
        let set = state.file_sets.entry(dest_set).or_default();
        set.local.insert(file_id.clone(), entry.clone());
        drop(state);
        self.persist_state().await?;
        Ok(entry)
    }
}
