//! `GetUpdates` merge rules: fold the remote's authoritative
//! response back into local `AlbumList` + file-set state without
//! clobbering concurrent local edits.

use std::collections::HashMap;

use vault_model::{Album, AlbumList, FileEntry, FileSet, Permissions, SetKey};
use vault_remote::dto::{AlbumUpdate, DeleteEvent, FileUpdate, GetUpdatesResponse};

fn parse_millis(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

fn set_key_for(file: &FileUpdate) -> SetKey {
    match file.set.as_str() {
        "gallery" => SetKey::Gallery,
        "trash" => SetKey::Trash,
        _ => SetKey::Album(file.album_id.clone().unwrap_or_default()),
    }
}

/// Apply one album update: always overwrite `remote`; overwrite `local`
/// only if the remote is strictly newer, preserving concurrent local
/// edits otherwise. Creates the file-set record if this album is new.
pub fn merge_album(list: &mut AlbumList, sets: &mut HashMap<SetKey, FileSet>, update: &AlbumUpdate) {
    let remote_album = Album {
        album_id: update.album_id.clone(),
        date_created: list
            .remote
            .get(&update.album_id)
            .map(|a| a.date_created.clone())
            .unwrap_or_else(|| update.date_modified.clone()),
        date_modified: update.date_modified.clone(),
        public_key: update.public_key.clone(),
        enc_private_key: update.enc_private_key.clone(),
        member_keys: update.member_keys.clone(),
        metadata: update.metadata.clone(),
        is_owner: update.is_owner,
        is_shared: update.is_shared,
        is_hidden: update.is_hidden,
        is_locked: update.is_locked,
        permissions: Permissions::parse(&update.permissions).unwrap_or_default(),
        members: update.members.clone(),
    };

    let should_overwrite_local = match list.local.get(&update.album_id) {
        None => true,
        Some(local) => parse_millis(&update.date_modified) > parse_millis(&local.date_modified),
    };
    if should_overwrite_local {
        list.local.insert(update.album_id.clone(), remote_album.clone());
    }
    list.remote.insert(update.album_id.clone(), remote_album);

    sets.entry(SetKey::Album(update.album_id.clone())).or_default();
    if parse_millis(&update.date_modified) > list.last_update_ts {
        list.last_update_ts = parse_millis(&update.date_modified);
    }
}

/// Apply one file update: overwrite both local and remote views of that
/// file in its set, restoring a locally-deleted owning album if the
/// remote reports new files for it.
pub fn merge_file(list: &mut AlbumList, sets: &mut HashMap<SetKey, FileSet>, update: &FileUpdate) {
    let key = set_key_for(update);
    let entry = FileEntry {
        file: update.file.clone(),
        version: update.version.clone(),
        date_created: update.date_created.clone(),
        date_modified: update.date_modified.clone(),
        headers: update.headers.clone(),
        album_id: update.album_id.clone(),
    };

    if let Some(album_id) = &update.album_id {
        if !list.local.contains_key(album_id) {
            if let Some(remote_album) = list.remote.get(album_id).cloned() {
                list.local.insert(album_id.clone(), remote_album);
            }
        }
    }

    let set = sets.entry(key).or_default();
    set.local.insert(update.file.clone(), entry.clone());
    set.remote.insert(update.file.clone(), entry);
    if parse_millis(&update.date_modified) > set.last_update_ts {
        set.last_update_ts = parse_millis(&update.date_modified);
    }
}

/// Apply one delete event: only remove when the event is strictly newer
/// than the record's current `date_modified`. Album deletes are retained
/// locally when the caller is owner with an unchanged, local-only-file-
/// free album, or when the local album has local-only files.
pub fn merge_delete(
    list: &mut AlbumList,
    sets: &mut HashMap<SetKey, FileSet>,
    event: &DeleteEvent,
) -> Option<(String, SetKey)> {
    let event_ts = parse_millis(&event.date);

    if event.is_album {
        let Some(local) = list.local.get(&event.identifier) else {
            list.remote.remove(&event.identifier);
            return None;
        };
        if event_ts <= parse_millis(&local.date_modified) {
            return None;
        }

        let empty = FileSet::default();
        let file_set = sets.get(&SetKey::Album(event.identifier.clone())).unwrap_or(&empty);
        let unchanged_vs_remote = list
            .remote
            .get(&event.identifier)
            .map(|remote| remote.date_modified == local.date_modified)
            .unwrap_or(false);
        let has_local_only_files = file_set.local.keys().any(|id| !file_set.remote.contains_key(id));

        let retain = (local.is_owner && unchanged_vs_remote && !has_local_only_files) || has_local_only_files;
        if !retain {
            list.local.remove(&event.identifier);
        }
        list.remote.remove(&event.identifier);
        return None;
    }

    for (key, set) in sets.iter_mut() {
        let newer_than_local = set
            .local
            .get(&event.identifier)
            .map(|e| event_ts > parse_millis(&e.date_modified))
            .unwrap_or(false);
        let newer_than_remote = set
            .remote
            .get(&event.identifier)
            .map(|e| event_ts > parse_millis(&e.date_modified))
            .unwrap_or(false);
        if newer_than_local {
            set.local.remove(&event.identifier);
        }
        if newer_than_remote {
            set.remote.remove(&event.identifier);
        }
        if newer_than_local || newer_than_remote {
            return Some((event.identifier.clone(), key.clone()));
        }
    }
    None
}

/// True once no remaining file set references `file_id` — the signal
/// that its on-disk blobs (main + thumb) may be safely deleted.
pub fn is_file_unreferenced(sets: &HashMap<SetKey, FileSet>, file_id: &str) -> bool {
    sets.values().all(|s| !s.local.contains_key(file_id) && !s.remote.contains_key(file_id))
}

/// Fold an entire `GetUpdates` response into local state, returning the
/// set of file ids that became unreferenced as a result (candidates for
/// on-disk blob cleanup).
pub fn merge_updates(
    list: &mut AlbumList,
    sets: &mut HashMap<SetKey, FileSet>,
    response: &GetUpdatesResponse,
) -> Vec<String> {
    for album in &response.albums {
        merge_album(list, sets, album);
    }
    for file in &response.files {
        merge_file(list, sets, file);
    }
    let mut newly_unreferenced = Vec::new();
    for event in &response.deletes {
        if let Some((file_id, _)) = merge_delete(list, sets, event) {
            if is_file_unreferenced(sets, &file_id) {
                newly_unreferenced.push(file_id);
            }
        }
    }
    newly_unreferenced
}
