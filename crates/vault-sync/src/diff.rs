//! Diff algorithm: derive a minimal, ordered sequence of
//! remote operations from local vs. last-known-remote state.

use std::collections::{HashMap, HashSet};

use vault_model::{Album, AlbumList, FileSet, SetKey};

/// One scheduled remote operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOp {
    AddAlbum { album_id: String },
    RenameAlbum { album_id: String },
    EditPerms { album_id: String },
    AddFile { file_id: String, set: SetKey },
    /// `moving=false` models a pure copy (file ends up in both places);
    /// `moving=true` removes the source.
    MoveFile { file_id: String, from: SetKey, to: SetKey, moving: bool },
    Delete { file_id: String, set: SetKey },
    RemoveAlbum { album_id: String },
    LeaveAlbum { album_id: String },
}

/// Diff the album list: schedules `AddAlbum`/`RenameAlbum`/`EditPerms`
/// for local albums, `RemoveAlbum`/`LeaveAlbum` for remote-only albums.
pub fn diff_albums(list: &AlbumList) -> Vec<SyncOp> {
    let mut ops = Vec::new();

    for (id, local) in &list.local {
        match list.remote.get(id) {
            None => ops.push(SyncOp::AddAlbum { album_id: id.clone() }),
            Some(remote) => {
                if local.metadata != remote.metadata {
                    ops.push(SyncOp::RenameAlbum { album_id: id.clone() });
                }
                if local.is_hidden != remote.is_hidden || local.permissions != remote.permissions {
                    ops.push(SyncOp::EditPerms { album_id: id.clone() });
                }
            }
        }
    }

    for (id, remote) in &list.remote {
        if !list.local.contains_key(id) {
            if remote.is_owner {
                ops.push(SyncOp::RemoveAlbum { album_id: id.clone() });
            } else {
                ops.push(SyncOp::LeaveAlbum { album_id: id.clone() });
            }
        }
    }

    ops
}

/// Build the `File -> set of (Set)` location map for either the local or
/// last-known-remote view across every tracked file set.
fn location_map(sets: &HashMap<SetKey, FileSet>, local: bool) -> HashMap<String, HashSet<SetKey>> {
    let mut map: HashMap<String, HashSet<SetKey>> = HashMap::new();
    for (key, set) in sets {
        let entries = if local { &set.local } else { &set.remote };
        for file_id in entries.keys() {
            map.entry(file_id.clone()).or_default().insert(key.clone());
        }
    }
    map
}

/// Diff file placement across all sets, inferring copy/move operations
/// by pairing adds with removes per file.
pub fn diff_files(sets: &HashMap<SetKey, FileSet>) -> Vec<SyncOp> {
    let local_map = location_map(sets, true);
    let remote_map = location_map(sets, false);

    let mut all_files: Vec<&String> = local_map.keys().chain(remote_map.keys()).collect();
    all_files.sort();
    all_files.dedup();

    let mut ops = Vec::new();

    for file_id in all_files {
        let empty = HashSet::new();
        let local_locs = local_map.get(file_id).unwrap_or(&empty);
        let remote_locs = remote_map.get(file_id).unwrap_or(&empty);

        let mut adds: Vec<SetKey> = local_locs.difference(remote_locs).cloned().collect();
        let mut removes: Vec<SetKey> = remote_locs.difference(local_locs).cloned().collect();
        adds.sort_by_key(set_sort_key);
        removes.sort_by_key(set_sort_key);

        // Pair adds with removes to become moves, preferring to consume
        // removes first so an unpaired add only happens when there truly
        // was no prior location for this file.
        let mut add_iter = adds.into_iter();
        let mut remove_iter = removes.into_iter();

        loop {
            match (add_iter.next(), remove_iter.next()) {
                (Some(to), Some(from)) => {
                    push_move(&mut ops, file_id, from, to);
                }
                (Some(to), None) => {
                    push_unpaired_add(&mut ops, file_id, to);
                }
                (None, Some(from)) => {
                    // Unpaired remove: the file vanished from this
                    // location locally with no replacement recorded — it
                    // was deleted outright, so route it through trash.
                    ops.push(SyncOp::MoveFile {
                        file_id: file_id.clone(),
                        from,
                        to: SetKey::Trash,
                        moving: true,
                    });
                    ops.push(SyncOp::Delete { file_id: file_id.clone(), set: SetKey::Trash });
                }
                (None, None) => break,
            }
        }
    }

    ops
}

fn set_sort_key(key: &SetKey) -> u8 {
    match key {
        SetKey::Gallery => 0,
        SetKey::Trash => 1,
        SetKey::Album(_) => 2,
    }
}

fn push_unpaired_add(ops: &mut Vec<SyncOp>, file_id: &str, to: SetKey) {
    if matches!(to, SetKey::Trash) {
        // adding straight to trash with no prior remote location: stage
        // through gallery first.
        ops.push(SyncOp::AddFile { file_id: file_id.to_string(), set: SetKey::Gallery });
        ops.push(SyncOp::MoveFile {
            file_id: file_id.to_string(),
            from: SetKey::Gallery,
            to: SetKey::Trash,
            moving: true,
        });
    } else {
        ops.push(SyncOp::AddFile { file_id: file_id.to_string(), set: to });
    }
}

fn push_move(ops: &mut Vec<SyncOp>, file_id: &str, from: SetKey, to: SetKey) {
    match (&from, &to) {
        (SetKey::Trash, SetKey::Album(_)) => {
            // only gallery destinations are legal in one hop out of
            // trash; an album destination becomes two moves via gallery.
            ops.push(SyncOp::MoveFile {
                file_id: file_id.to_string(),
                from: SetKey::Trash,
                to: SetKey::Gallery,
                moving: true,
            });
            ops.push(SyncOp::MoveFile {
                file_id: file_id.to_string(),
                from: SetKey::Gallery,
                to,
                moving: true,
            });
        }
        _ => {
            ops.push(SyncOp::MoveFile { file_id: file_id.to_string(), from, to, moving: true });
        }
    }
}

/// Order a mixed batch of operations per : AddAlbum ->
/// RenameAlbum -> EditPerms -> AddFile -> MoveFile (trash-source first;
/// then pure copies; then non-trash moves; then moves into trash) ->
/// Delete -> RemoveAlbum/LeaveAlbum.
pub fn order_ops(mut ops: Vec<SyncOp>) -> Vec<SyncOp> {
    ops.sort_by_key(execution_rank);
    ops
}

fn execution_rank(op: &SyncOp) -> u8 {
    match op {
        SyncOp::AddAlbum { .. } => 0,
        SyncOp::RenameAlbum { .. } => 1,
        SyncOp::EditPerms { .. } => 2,
        SyncOp::AddFile { .. } => 3,
        SyncOp::MoveFile { from, to, moving } => {
            if matches!(from, SetKey::Trash) {
                4
            } else if !moving {
                5
            } else if matches!(to, SetKey::Trash) {
                7
            } else {
                6
            }
        }
        SyncOp::Delete { .. } => 8,
        SyncOp::RemoveAlbum { .. } | SyncOp::LeaveAlbum { .. } => 9,
    }
}
