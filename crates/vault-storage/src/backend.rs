//! Pluggable storage backend.
//!
//! An `#[async_trait] pub trait ... Send + Sync` over named byte records
//! with exclusive-create and rename primitives — the building blocks
//! [`crate::atomic`] and [`crate::lock`] compose into higher-level
//! atomicity.

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// Storage backend: a namespace of byte blobs addressed by relative path.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Read the full contents of `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create `path` with `O_CREATE|O_EXCL` semantics and write `data`,
    /// fsyncing before returning. Fails with `AlreadyExists` if present.
    async fn create_exclusive(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Overwrite `path` unconditionally (used for the final atomic rename
    /// target, never for the exclusive tmp-file step).
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Rename `from` to `to`; the commit point of an atomic write.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Hard-link `from` to `to` if supported, else copy bytewise.
    async fn link_or_copy(&self, from: &str, to: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// List entries directly under `prefix` (non-recursive).
    async fn list_dir(&self, prefix: &str) -> Result<Vec<String>>;

    /// Modification time in nanoseconds since epoch, if the backend knows it.
    async fn modified_nanos(&self, path: &str) -> Result<Option<u128>>;
}

/// On-disk backend rooted at a directory.
pub struct FsRecordBackend {
    root: PathBuf,
}

impl FsRecordBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsRecordBackend { root: root.into() }
    }

    fn full(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl RecordBackend for FsRecordBackend {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.full(path);
        tokio::fs::read(&full)
            .await
            .map_err(|e| map_not_found(e, path))
    }

    async fn create_exclusive(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.full(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = data.to_vec();
        let full2 = full.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&full2)
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::AlreadyExists {
                        StorageError::AlreadyExists(full2.display().to_string())
                    } else {
                        StorageError::Io(e)
                    }
                })?;
            f.write_all(&data)?;
            f.sync_all()?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        Ok(())
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.full(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let to_full = self.full(to);
        if let Some(parent) = to_full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(self.full(from), to_full).await?;
        Ok(())
    }

    async fn link_or_copy(&self, from: &str, to: &str) -> Result<()> {
        let from_full = self.full(from);
        let to_full = self.full(to);
        if let Some(parent) = to_full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::hard_link(&from_full, &to_full).await.is_err() {
            tokio::fs::copy(&from_full, &to_full).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.full(path)).await.is_ok())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(self.full(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list_dir(&self, prefix: &str) -> Result<Vec<String>> {
        let full = self.full(prefix);
        let mut out = Vec::new();
        let mut rd = match tokio::fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(StorageError::Io(e)),
        };
        while let Some(entry) = rd.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                out.push(name.to_string());
            }
        }
        Ok(out)
    }

    async fn modified_nanos(&self, path: &str) -> Result<Option<u128>> {
        let meta = match tokio::fs::metadata(self.full(path)).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let modified = meta.modified()?;
        let nanos = modified
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Ok(Some(nanos))
    }
}

fn map_not_found(e: std::io::Error, path: &str) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(e)
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemoryRecordBackend {
    files: DashMap<String, Vec<u8>>,
    mtimes: DashMap<String, u128>,
    counter: std::sync::atomic::AtomicU64,
}

impl MemoryRecordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> u128 {
        self.counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) as u128
    }
}

#[async_trait]
impl RecordBackend for MemoryRecordBackend {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .map(|v| v.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn create_exclusive(&self, path: &str, data: &[u8]) -> Result<()> {
        if self.files.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        self.files.insert(path.to_string(), data.to_vec());
        let t = self.tick();
        self.mtimes.insert(path.to_string(), t);
        Ok(())
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files.insert(path.to_string(), data.to_vec());
        let t = self.tick();
        self.mtimes.insert(path.to_string(), t);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let data = self
            .files
            .remove(from)
            .map(|(_, v)| v)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        self.files.insert(to.to_string(), data);
        let t = self.tick();
        self.mtimes.insert(to.to_string(), t);
        Ok(())
    }

    async fn link_or_copy(&self, from: &str, to: &str) -> Result<()> {
        let data = self
            .files
            .get(from)
            .map(|v| v.clone())
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        self.files.insert(to.to_string(), data);
        let t = self.tick();
        self.mtimes.insert(to.to_string(), t);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.files.remove(path);
        self.mtimes.remove(path);
        Ok(())
    }

    async fn list_dir(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix_with_slash = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let mut out: Vec<String> = self
            .files
            .iter()
            .filter_map(|e| {
                let key = e.key();
                key.strip_prefix(&prefix_with_slash)
                    .and_then(|rest| rest.split('/').next())
                    .map(|s| s.to_string())
            })
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn modified_nanos(&self, path: &str) -> Result<Option<u128>> {
        Ok(self.mtimes.get(path).map(|v| *v))
    }
}

#[allow(dead_code)]
fn _assert_path_is_relative(p: &Path) {
    debug_assert!(p.is_relative());
}
