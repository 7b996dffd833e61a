//! Client data model, glob engine, and mutation contracts:
//! the typed album/file-set records, the virtual namespace they project
//! into, shell-style glob matching over that namespace, and the
//! add/remove/copy/move/delete contracts that keep the two consistent.
//!
//! Deliberately synchronous and storage-agnostic — `vault-sync` and the
//! root `vault` facade own loading records through
//! `vault_storage::TypedTransaction` and committing the result.

pub mod error;
pub mod glob;
pub mod import_export;
pub mod mutate;
pub mod namespace;
pub mod sanitize;
pub mod types;

pub use error::{ModelError, Result};
pub use glob::{glob as glob_match, GlobEntry, GlobOptions};
pub use namespace::{AlbumView, Namespace};
pub use types::{Album, AlbumList, Contact, FileEntry, FileSet, FileType, Permissions, SetKey};
