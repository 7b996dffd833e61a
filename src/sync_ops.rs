//! Wires [`vault_sync::SyncEngine`] into the facade's `push`/`pull`/
//! `sync`/`free`/`get_updates` entry points, driving each remote call
//! against locally-tracked state and reporting what happened.

use std::path::PathBuf;
use std::sync::Arc;

use vault_model::GlobOptions;
use vault_remote::dto::{DownloadRequest, UpdateCursors};
use vault_sync::{BlobSource, ExecutionReport, Result as SyncResult, SyncEngine};

use crate::error::Result;
use crate::Vault;

/// Reads already-encrypted blob bytes straight off disk for upload —
/// the blob is already sealed by [`vault_storage::blob`] at import time,
/// so this is a plain file read, not a re-encryption.
struct DiskBlobSource {
    blob_dir: PathBuf,
}

impl BlobSource for DiskBlobSource {
    fn read_main(&self, file_id: &str) -> SyncResult<bytes::Bytes> {
        let data = std::fs::read(self.blob_dir.join(file_id)).map_err(vault_storage::StorageError::from)?;
        Ok(bytes::Bytes::from(data))
    }

    fn read_thumb(&self, file_id: &str) -> SyncResult<bytes::Bytes> {
        let data =
            std::fs::read(self.blob_dir.join(format!("{file_id}-thumb"))).map_err(vault_storage::StorageError::from)?;
        Ok(bytes::Bytes::from(data))
    }
}

/// Write `data` to `path` via `<path>.tmp-<nanos>` + rename ('s
/// atomic single-file write, applied to a pulled blob rather than an
/// encrypted record — the bytes are already sealed by the sender).
fn write_blob_atomic(path: &std::path::Path, data: &[u8]) -> Result<()> {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".tmp-{nanos}"));
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl Vault {
    fn sync_engine(&self) -> SyncEngine {
        let blobs: Arc<dyn BlobSource> = Arc::new(DiskBlobSource { blob_dir: self.config.blob_dir() });
        SyncEngine::new(Arc::clone(&self.remote), blobs)
    }

    /// Push local-only changes (new/renamed/deleted albums, relocated
    /// files) to the remote, or just report the planned ops if
    /// `dry_run`.
    pub async fn push(&self, dry_run: bool) -> Result<ExecutionReport> {
        let (token, list, sets) = {
            let state = self.state.read().await;
            let account = state.account()?;
            (account.session_token.clone(), state.album_list.clone(), state.file_sets.clone())
        };
        Ok(self.sync_engine().push(&token, &list, &sets, dry_run).await?)
    }

    /// Call `GetUpdates` and merge the response into local state,
    /// persisting the result and returning file ids that became
    /// unreferenced (candidates for [`Vault::free`]).
    pub async fn get_updates(&self) -> Result<Vec<String>> {
        let (token, mut list, mut sets, cursors) = {
            let state = self.state.read().await;
            let account = state.account()?;
            (account.session_token.clone(), state.album_list.clone(), state.file_sets.clone(), state.cursors)
        };
        let (unreferenced, new_cursors) = self.sync_engine().pull(&token, &mut list, &mut sets, cursors).await?;

        {
            let mut state = self.state.write().await;
            state.album_list = list;
            state.file_sets = sets;
            state.cursors = new_cursors;
        }
        self.persist_state().await?;
        Ok(unreferenced)
    }

    /// Push, then fetch updates — the combined round-trip a CLI's `sync`
    /// command drives.
    pub async fn sync(&self) -> Result<(ExecutionReport, Vec<String>)> {
        let report = self.push(false).await?;
        let unreferenced = self.get_updates().await?;
        Ok((report, unreferenced))
    }

    /// Delete main/thumbnail blobs for file ids no longer referenced by
    /// any set, reclaiming local disk space (`free`).
    pub async fn free(&self, file_ids: &[String]) -> Result<()> {
        for id in file_ids {
            let main = self.config.blob_dir().join(id);
            let thumb = self.config.blob_dir().join(format!("{id}-thumb"));
            if main.exists() {
                std::fs::remove_file(&main)?;
            }
            if thumb.exists() {
                std::fs::remove_file(&thumb)?;
            }
        }
        Ok(())
    }

    /// Download main/thumbnail blobs for every file matching `pattern`
    /// that isn't already on local disk (`pull`). Returns the number of
    /// files whose blobs were fetched.
    pub async fn pull(&self, pattern: &str, opts: &GlobOptions) -> Result<usize> {
        let (token, matches) = {
            let (ns, _) = self.build_namespace().await?;
            let state = self.state.read().await;
            let token = state.account()?.session_token.clone();
            (token, vault_model::glob_match(&ns.entries, pattern, opts))
        };

        let blob_dir = self.config.blob_dir();
        let mut downloaded = 0usize;
        for entry in matches {
            let Some(file_id) = entry.file_id else { continue };
            let main_path = blob_dir.join(&file_id);
            if main_path.exists() {
                continue;
            }
            let main = self
                .remote
                .download(DownloadRequest { session_token: token.clone(), file: file_id.clone(), thumb: false })
                .await?;
            let thumb = self
                .remote
                .download(DownloadRequest { session_token: token.clone(), file: file_id.clone(), thumb: true })
                .await?;
            write_blob_atomic(&main_path, &main.data)?;
            write_blob_atomic(&blob_dir.join(format!("{file_id}-thumb")), &thumb.data)?;
            downloaded += 1;
        }
        Ok(downloaded)
    }

    /// The cursors the next [`Vault::get_updates`] will send.
    pub async fn update_cursors(&self) -> Result<UpdateCursors> {
        let state = self.state.read().await;
        Ok(state.cursors)
    }
}
