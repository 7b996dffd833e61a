//! Sync engine: diffs local vault state against the last
//! known remote snapshot, executes the resulting operations against a
//! [`vault_remote::RemoteApi`], and folds `GetUpdates` responses back
//! into local state — reconciling local intent against a remote
//! service, fanning work out across a worker pool, and reporting
//! aggregate success/failure as a full bidirectional diff.

pub mod diff;
pub mod error;
pub mod exec;
pub mod merge;
pub mod workers;

pub use error::{Result, SyncError};

use std::collections::HashMap;
use std::sync::Arc;

use vault_model::{AlbumList, FileSet, SetKey};
use vault_remote::dto::{GetUpdatesRequest, UpdateCursors};
use vault_remote::RemoteApi;

pub use diff::SyncOp;
pub use exec::{BlobSource, ExecutionReport};

/// Ties local state, a remote API handle, and blob access together so
/// callers (the `vault` facade crate) don't have to thread diff/exec/merge
/// plumbing through themselves.
pub struct SyncEngine {
    remote: Arc<dyn RemoteApi>,
    blobs: Arc<dyn BlobSource>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteApi>, blobs: Arc<dyn BlobSource>) -> Self {
        Self { remote, blobs }
    }

    /// Push local changes: diff local vs last-known-remote state, order
    /// the resulting ops, and run them (or just report them, if
    /// `dry_run`).
    pub async fn push(
        &self,
        session_token: &str,
        list: &AlbumList,
        sets: &HashMap<SetKey, FileSet>,
        dry_run: bool,
    ) -> Result<ExecutionReport> {
        let mut ops = diff::diff_albums(list);
        ops.extend(diff::diff_files(sets));
        exec::execute(Arc::clone(&self.remote), session_token, list, sets, Arc::clone(&self.blobs), ops, dry_run)
            .await
    }

    /// Pull remote changes: call `GetUpdates` with the given cursors and
    /// merge the response into local state, returning file ids that
    /// became unreferenced (candidates for blob cleanup) and the new
    /// cursors to persist.
    pub async fn pull(
        &self,
        session_token: &str,
        list: &mut AlbumList,
        sets: &mut HashMap<SetKey, FileSet>,
        cursors: UpdateCursors,
    ) -> Result<(Vec<String>, UpdateCursors)> {
        let response = self
            .remote
            .get_updates(GetUpdatesRequest { session_token: session_token.to_string(), cursors })
            .await?;
        let new_cursors = response.cursors;
        let unreferenced = merge::merge_updates(list, sets, &response);
        Ok((unreferenced, new_cursors))
    }
}
