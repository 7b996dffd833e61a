//! Album and file mutation contracts: `add_album`,
//! `remove_album`, and the copy/move/delete file-set mechanics. These
//! operate on already-loaded [`AlbumList`]/[`FileSet`] values — the
//! caller (`vault-sync` or the root `vault` facade) is responsible for
//! loading them through a [`vault_storage::TypedTransaction`] and
//! committing the result, and for supplying a [`HeaderReencryptor`] that
//! holds the actual key material this crate never sees.
//!
//! Kept deliberately synchronous and storage-agnostic so the contract
//! logic is unit-testable without a backend.

use std::collections::HashMap;

use crate::error::{ModelError, Result};
use crate::types::{Album, AlbumList, FileEntry, FileSet, Permissions, SetKey};

/// Decrypts a file's sealed header pair under the source key, optionally
/// overwrites the filename, and reseals under the destination key.
/// Implemented over `vault_wire::file_header::reencrypt` by the caller,
/// which is the only party holding the album/account secret keys.
pub trait HeaderReencryptor {
    fn reencrypt(&self, sealed_headers: &[u8], new_filename: Option<&str>) -> Result<Vec<u8>>;
}

const RESERVED_SHARED: &str = "shared";

/// Create a new local-only album. `existing_names` is the caller's
/// decrypted view of every current album name (local + remote merge),
/// since the name itself lives inside sealed metadata this crate cannot
/// read.
pub fn add_album(
    list: &mut AlbumList,
    existing_names: &std::collections::HashSet<String>,
    name: &str,
    public_key: Vec<u8>,
    enc_private_key: Vec<u8>,
    sealed_metadata: Vec<u8>,
) -> Result<Album> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Err(ModelError::ValidationError(format!("illegal album name: {name:?}")));
    }
    if trimmed == RESERVED_SHARED || trimmed.starts_with("shared/") {
        return Err(ModelError::ValidationError("\"shared\" is reserved for incoming shares".into()));
    }
    if existing_names.contains(trimmed) {
        return Err(ModelError::AlreadyExists(format!("album {trimmed:?} already exists")));
    }

    let now = crate::types::now_millis_string();
    let album = Album {
        album_id: crate::types::new_album_id(),
        date_created: now.clone(),
        date_modified: now,
        public_key,
        enc_private_key,
        member_keys: HashMap::new(),
        metadata: sealed_metadata,
        is_owner: true,
        is_shared: false,
        is_hidden: false,
        is_locked: false,
        permissions: Permissions { allow_add: true, allow_share: true, allow_copy: true },
        members: Vec::new(),
    };
    list.local.insert(album.album_id.clone(), album.clone());
    Ok(album)
}

/// Remove a local album. Fails if its file set isn't empty. The file-set
/// record itself is only deleted (vs. left as an empty tombstone) if the
/// album was local-only, i.e. never synced (absent from `remote`).
pub fn remove_album(list: &mut AlbumList, set: &FileSet, album_id: &str) -> Result<bool> {
    let album = list
        .local
        .get(album_id)
        .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
    if !album.is_owner {
        return Err(ModelError::NotAllowed("only the owner may remove an album".into()));
    }
    if !set.local.is_empty() || !set.remote.is_empty() {
        return Err(ModelError::NotEmpty(format!("album {album_id} is not empty")));
    }
    let was_local_only = !list.remote.contains_key(album_id);
    list.local.remove(album_id);
    Ok(was_local_only)
}

/// A non-owner may only leave a shared album, never rename/reconfigure
/// it.
pub fn assert_mutable_by_owner(album: &Album) -> Result<()> {
    if !album.is_owner {
        return Err(ModelError::NotAllowed("non-owner may only leave a shared album".into()));
    }
    Ok(())
}

pub fn rename_album(album: &mut Album, sealed_metadata: Vec<u8>) -> Result<()> {
    assert_mutable_by_owner(album)?;
    album.metadata = sealed_metadata;
    album.date_modified = crate::types::now_millis_string();
    Ok(())
}

pub fn change_permissions(album: &mut Album, grammar: &str) -> Result<()> {
    assert_mutable_by_owner(album)?;
    album.permissions = album
        .permissions
        .apply_grammar(grammar)
        .map_err(ModelError::ValidationError)?;
    album.date_modified = crate::types::now_millis_string();
    Ok(())
}

/// Where a single file transfer crosses gallery/album/trash boundaries,
/// requiring header re-encryption under a different key.
pub struct TransferKeys<'a> {
    pub source_key_changes: bool,
    pub reencryptor: &'a dyn HeaderReencryptor,
}

/// Copy one file entry from `source` to `dest` (same set allowed — e.g.
/// copying within gallery is a no-op error per "two names in the same
/// directory"). `dest_album_id` is `None` for gallery/trash.
pub fn copy_file(
    source: &FileSet,
    dest: &mut FileSet,
    file_id: &str,
    dest_album_id: Option<String>,
    new_filename: Option<&str>,
    keys: &TransferKeys<'_>,
) -> Result<()> {
    let entry = source
        .local
        .get(file_id)
        .or_else(|| source.remote.get(file_id))
        .ok_or_else(|| ModelError::NotFound(format!("file {file_id}")))?
        .clone();

    if dest.local.contains_key(file_id) || dest.remote.contains_key(file_id) {
        return Err(ModelError::AlreadyExists(format!(
            "file {file_id} already present in destination"
        )));
    }

    let headers = if keys.source_key_changes || new_filename.is_some() {
        keys.reencryptor.reencrypt(&entry.headers, new_filename)?
    } else {
        entry.headers.clone()
    };

    let new_entry = FileEntry {
        file: entry.file.clone(),
        version: entry.version.clone(),
        date_created: entry.date_created.clone(),
        date_modified: crate::types::now_millis_string(),
        headers,
        album_id: dest_album_id,
    };
    dest.local.insert(file_id.to_string(), new_entry);
    Ok(())
}

/// Move one file entry from `source` to `dest`, removing it from the
/// source set. Delegates the header/metadata work to [`copy_file`] then
/// deletes the source-side local entry (the remote-side removal is a
/// sync-time concern, tracked via `last_known_remote` bookkeeping, not
/// here).
pub fn move_file(
    source: &mut FileSet,
    dest: &mut FileSet,
    file_id: &str,
    dest_album_id: Option<String>,
    new_filename: Option<&str>,
    keys: &TransferKeys<'_>,
) -> Result<()> {
    copy_file(source, dest, file_id, dest_album_id, new_filename, keys)?;
    source.local.remove(file_id);
    Ok(())
}

/// Delete a file: if it's already in trash, remove it from the trash set
/// (caller drops the blob separately once no set references it); if it's
/// elsewhere, move it to trash (re-encrypting headers under the
/// account's own key, since trash is always owned by the account).
pub fn delete_file(
    source: &mut FileSet,
    trash: &mut FileSet,
    file_id: &str,
    already_in_trash: bool,
    keys: &TransferKeys<'_>,
) -> Result<()> {
    if already_in_trash {
        source.local.remove(file_id);
        source.remote.remove(file_id);
        return Ok(());
    }
    move_file(source, trash, file_id, None, None, keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopReencryptor;
    impl HeaderReencryptor for NoopReencryptor {
        fn reencrypt(&self, sealed_headers: &[u8], new_filename: Option<&str>) -> Result<Vec<u8>> {
            let _ = new_filename;
            Ok(sealed_headers.to_vec())
        }
    }

    fn sample_entry(album_id: Option<&str>) -> FileEntry {
        FileEntry {
            file: "image000.jpg.sp".into(),
            version: "1".into(),
            date_created: "1000".into(),
            date_modified: "1000".into(),
            headers: vec![1, 2, 3],
            album_id: album_id.map(String::from),
        }
    }

    #[test]
    fn add_album_rejects_reserved_names() {
        let mut list = AlbumList::default();
        let existing = std::collections::HashSet::new();
        assert!(add_album(&mut list, &existing, "shared", vec![], vec![], vec![]).is_err());
        assert!(add_album(&mut list, &existing, "shared/x", vec![], vec![], vec![]).is_err());
        assert!(add_album(&mut list, &existing, "", vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn add_album_rejects_duplicate_names() {
        let mut list = AlbumList::default();
        let mut existing = std::collections::HashSet::new();
        existing.insert("alpha".to_string());
        assert!(matches!(
            add_album(&mut list, &existing, "alpha", vec![], vec![], vec![]),
            Err(ModelError::AlreadyExists(_))
        ));
    }

    #[test]
    fn remove_album_fails_when_not_empty() {
        let mut list = AlbumList::default();
        let album = Album {
            album_id: "id1".into(),
            date_created: "0".into(),
            date_modified: "0".into(),
            public_key: vec![],
            enc_private_key: vec![],
            member_keys: HashMap::new(),
            metadata: vec![],
            is_owner: true,
            is_shared: false,
            is_hidden: false,
            is_locked: false,
            permissions: Permissions::default(),
            members: vec![],
        };
        list.local.insert("id1".into(), album);
        let mut set = FileSet::default();
        set.local.insert("f1".into(), sample_entry(Some("id1")));
        assert!(matches!(remove_album(&mut list, &set, "id1"), Err(ModelError::NotEmpty(_))));

        set.local.clear();
        assert!(remove_album(&mut list, &set, "id1").is_ok());
        assert!(!list.local.contains_key("id1"));
    }

    #[test]
    fn copy_file_rejects_duplicate_in_destination() {
        let mut source = FileSet::default();
        source.local.insert("f1".into(), sample_entry(None));
        let mut dest = FileSet::default();
        dest.local.insert("f1".into(), sample_entry(None));

        let keys = TransferKeys { source_key_changes: false, reencryptor: &NoopReencryptor };
        let err = copy_file(&source, &mut dest, "f1", None, None, &keys).unwrap_err();
        assert!(matches!(err, ModelError::AlreadyExists(_)));
    }

    #[test]
    fn move_file_removes_from_source_and_adds_to_dest() {
        let mut source = FileSet::default();
        source.local.insert("f1".into(), sample_entry(None));
        let mut dest = FileSet::default();

        let keys = TransferKeys { source_key_changes: true, reencryptor: &NoopReencryptor };
        move_file(&mut source, &mut dest, "f1", Some("album1".into()), Some("renamed.jpg"), &keys).unwrap();

        assert!(!source.local.contains_key("f1"));
        assert!(dest.local.contains_key("f1"));
        assert_eq!(dest.local["f1"].album_id.as_deref(), Some("album1"));
    }

    #[test]
    fn delete_from_trash_removes_entirely() {
        let mut trash = FileSet::default();
        trash.local.insert("f1".into(), sample_entry(None));
        let mut unused = FileSet::default();
        let keys = TransferKeys { source_key_changes: false, reencryptor: &NoopReencryptor };
        delete_file(&mut trash, &mut unused, "f1", true, &keys).unwrap();
        assert!(!trash.local.contains_key("f1"));
    }

    #[test]
    fn delete_elsewhere_moves_to_trash() {
        let mut gallery = FileSet::default();
        gallery.local.insert("f1".into(), sample_entry(None));
        let mut trash = FileSet::default();
        let keys = TransferKeys { source_key_changes: true, reencryptor: &NoopReencryptor };
        delete_file(&mut gallery, &mut trash, "f1", false, &keys).unwrap();
        assert!(!gallery.local.contains_key("f1"));
        assert!(trash.local.contains_key("f1"));
    }
}
