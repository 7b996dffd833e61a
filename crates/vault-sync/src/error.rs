use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Model(#[from] vault_model::ModelError),

    #[error(transparent)]
    Storage(#[from] vault_storage::StorageError),

    #[error(transparent)]
    Wire(#[from] vault_wire::WireError),

    #[error(transparent)]
    Remote(#[from] vault_remote::RemoteError),

    /// A fan-out batch partially failed: `succeeded` items
    /// completed; `first_error` is the earliest failure encountered, with
    /// the rest of the failures appended for diagnostics.
    #[error("{succeeded} succeeded, {} failed; first error: {first_error}", rest.len() + 1)]
    PartialFailure {
        succeeded: usize,
        first_error: Box<SyncError>,
        rest: Vec<SyncError>,
    },
}
