//! Execute an ordered [`crate::diff::SyncOp`] sequence against a
//! [`vault_remote::RemoteApi`]. `AddFile` uploads run
//! through the bounded worker pool ("Concurrency"); everything
//! else is a single small metadata call and runs sequentially, since the
//! diff/merge step that produced the ops is itself single-threaded.

use std::collections::HashMap;
use std::sync::Arc;

use vault_model::{AlbumList, FileSet, SetKey};
use vault_remote::dto::{
    AddAlbumRequest, DeleteRequest, EditPermsRequest, MoveFileRequest, RenameAlbumRequest, UploadRequest,
};
use vault_remote::RemoteApi;

use crate::diff::{order_ops, SyncOp};
use crate::error::{Result, SyncError};
use crate::workers;

/// Supplies the raw blob bytes for a file being uploaded — the real
/// bytes live in `vault-storage`'s blob directory, which this crate
/// doesn't read directly so diff/merge/exec stay storage-agnostic.
pub trait BlobSource: Send + Sync {
    fn read_main(&self, file_id: &str) -> Result<bytes::Bytes>;
    fn read_thumb(&self, file_id: &str) -> Result<bytes::Bytes>;
}

fn set_name(key: &SetKey) -> String {
    match key {
        SetKey::Gallery => "gallery".to_string(),
        SetKey::Trash => "trash".to_string(),
        SetKey::Album(id) => id.clone(),
    }
}

fn album_id_of(key: &SetKey) -> Option<String> {
    key.album_id().map(String::from)
}

/// What running (or dry-running) an ordered op batch produced.
#[derive(Debug)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub planned: Vec<SyncOp>,
    pub succeeded: usize,
}

/// Plan (order) the ops without executing — used both for `dry_run` and
/// as the first step of a real run, so the two are guaranteed identical
/// in scheduling.
pub fn plan(ops: Vec<SyncOp>) -> Vec<SyncOp> {
    order_ops(ops)
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    remote: Arc<dyn RemoteApi>,
    session_token: &str,
    list: &AlbumList,
    sets: &HashMap<SetKey, FileSet>,
    blobs: Arc<dyn BlobSource>,
    ops: Vec<SyncOp>,
    dry_run: bool,
) -> Result<ExecutionReport> {
    let planned = plan(ops);
    if dry_run {
        return Ok(ExecutionReport { dry_run: true, planned, succeeded: 0 });
    }

    let (add_files, rest): (Vec<SyncOp>, Vec<SyncOp>) =
        planned.clone().into_iter().partition(|op| matches!(op, SyncOp::AddFile { .. }));

    let mut succeeded = 0usize;

    if !add_files.is_empty() {
        let remote = Arc::clone(&remote);
        let token = session_token.to_string();
        let list_snapshot = list.clone();
        let sets_snapshot = sets.clone();
        let blobs = Arc::clone(&blobs);
        succeeded += workers::run_bounded(add_files, move |op| {
            let remote = Arc::clone(&remote);
            let token = token.clone();
            let list_snapshot = list_snapshot.clone();
            let sets_snapshot = sets_snapshot.clone();
            let blobs = Arc::clone(&blobs);
            async move { exec_one(remote.as_ref(), &token, &list_snapshot, &sets_snapshot, blobs.as_ref(), op).await }
        })
        .await?;
    }

    for op in rest {
        exec_one(remote.as_ref(), session_token, list, sets, blobs.as_ref(), op).await?;
        succeeded += 1;
    }

    Ok(ExecutionReport { dry_run: false, planned, succeeded })
}

async fn exec_one(
    remote: &dyn RemoteApi,
    session_token: &str,
    list: &AlbumList,
    sets: &HashMap<SetKey, FileSet>,
    blobs: &dyn BlobSource,
    op: SyncOp,
) -> Result<()> {
    match op {
        SyncOp::AddAlbum { album_id } => {
            let album = list
                .local
                .get(&album_id)
                .ok_or_else(|| SyncError::Model(vault_model::ModelError::NotFound(album_id.clone())))?;
            remote
                .add_album(AddAlbumRequest {
                    session_token: session_token.to_string(),
                    album_id: album_id.clone(),
                    public_key: album.public_key.clone(),
                    enc_private_key: album.enc_private_key.clone(),
                    metadata: album.metadata.clone(),
                })
                .await?;
        }
        SyncOp::RenameAlbum { album_id } => {
            let album = list
                .local
                .get(&album_id)
                .ok_or_else(|| SyncError::Model(vault_model::ModelError::NotFound(album_id.clone())))?;
            remote
                .rename_album(RenameAlbumRequest {
                    session_token: session_token.to_string(),
                    album_id,
                    metadata: album.metadata.clone(),
                })
                .await?;
        }
        SyncOp::EditPerms { album_id } => {
            let album = list
                .local
                .get(&album_id)
                .ok_or_else(|| SyncError::Model(vault_model::ModelError::NotFound(album_id.clone())))?;
            remote
                .edit_perms(EditPermsRequest {
                    session_token: session_token.to_string(),
                    album_id,
                    permissions: album.permissions.to_token(),
                })
                .await?;
        }
        SyncOp::AddFile { file_id, set } => {
            let entry = sets
                .get(&set)
                .and_then(|s| s.local.get(&file_id))
                .ok_or_else(|| SyncError::Model(vault_model::ModelError::NotFound(file_id.clone())))?;
            let main_blob = blobs.read_main(&file_id)?;
            let thumb_blob = blobs.read_thumb(&file_id)?;
            remote
                .upload(UploadRequest {
                    session_token: session_token.to_string(),
                    file: file_id,
                    set: set_name(&set),
                    album_id: album_id_of(&set),
                    version: entry.version.clone(),
                    date_created: entry.date_created.clone(),
                    date_modified: entry.date_modified.clone(),
                    headers: entry.headers.clone(),
                    main_blob,
                    thumb_blob,
                })
                .await?;
        }
        SyncOp::MoveFile { file_id, from, to, moving } => {
            let headers = sets
                .get(&to)
                .and_then(|s| s.local.get(&file_id))
                .map(|e| e.headers.clone());
            remote
                .move_file(MoveFileRequest {
                    session_token: session_token.to_string(),
                    file: file_id,
                    from_set: set_name(&from),
                    from_album_id: album_id_of(&from),
                    to_set: set_name(&to),
                    to_album_id: album_id_of(&to),
                    headers,
                })
                .await?;
            // server infers copy-vs-move from from/to plus a follow-up Delete op
            let _ = moving;
        }
        SyncOp::Delete { file_id, set } => {
            remote
                .delete(DeleteRequest { session_token: session_token.to_string(), file: file_id, set: set_name(&set) })
                .await?;
        }
        SyncOp::RemoveAlbum { album_id } => {
            remote
                .delete_album(vault_remote::dto::DeleteAlbumRequest {
                    session_token: session_token.to_string(),
                    album_id,
                })
                .await?;
        }
        SyncOp::LeaveAlbum { album_id } => {
            remote
                .leave_album(vault_remote::dto::LeaveAlbumRequest {
                    session_token: session_token.to_string(),
                    album_id,
                })
                .await?;
        }
    }
    Ok(())
}
