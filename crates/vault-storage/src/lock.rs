//! Named advisory locks: a sidecar `<name>.lock` file created with
//! exclusive-create semantics. A busy lock makes the caller poll with
//! 50–150 ms jitter; a background reaper removes locks older than a
//! randomized 600–660 second deadline so a crashed holder can't wedge a
//! record forever. Multi-name locking acquires in sorted order and
//! releases in reverse, so any two transactions over overlapping record
//! sets can never deadlock against each other.

use rand::Rng;
use std::time::Duration;

use crate::backend::RecordBackend;
use crate::error::{Result, StorageError};

fn lock_path(name: &str) -> String {
    format!("{name}.lock")
}

/// Try to acquire the lock once. Does not poll.
async fn try_acquire(backend: &dyn RecordBackend, name: &str) -> Result<bool> {
    let stamp = current_nanos().to_le_bytes();
    match backend.create_exclusive(&lock_path(name), &stamp).await {
        Ok(()) => Ok(true),
        Err(StorageError::AlreadyExists(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn current_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// Acquire the lock on `name`, polling with 50–150 ms jitter while busy.
pub async fn acquire(backend: &dyn RecordBackend, name: &str) -> Result<()> {
    loop {
        if try_acquire(backend, name).await? {
            return Ok(());
        }
        let jitter_ms = rand::thread_rng().gen_range(50..=150);
        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
    }
}

/// Release the lock on `name`.
pub async fn release(backend: &dyn RecordBackend, name: &str) -> Result<()> {
    backend.delete(&lock_path(name)).await
}

/// Acquire locks on `names` in sorted order (dedup'd), returning the
/// sorted list so the caller can release in reverse with
/// [`release_many`].
pub async fn acquire_many(backend: &dyn RecordBackend, names: &[String]) -> Result<Vec<String>> {
    let mut sorted: Vec<String> = names.to_vec();
    sorted.sort();
    sorted.dedup();
    for (i, name) in sorted.iter().enumerate() {
        if let Err(e) = acquire(backend, name).await {
            for held in sorted[..i].iter().rev() {
                let _ = release(backend, held).await;
            }
            return Err(e);
        }
    }
    Ok(sorted)
}

/// Release locks acquired via [`acquire_many`], in reverse order.
pub async fn release_many(backend: &dyn RecordBackend, sorted_names: &[String]) {
    for name in sorted_names.iter().rev() {
        let _ = release(backend, name).await;
    }
}

/// Picks a randomized stale-lock deadline in `[600, 660)` seconds once,
/// at construction, and sweeps lock files older than it on each
/// [`StaleLockReaper::sweep`] call. Intended to be driven by a background
/// `tokio::spawn` loop from `Storage::open`.
pub struct StaleLockReaper {
    max_age: Duration,
}

impl StaleLockReaper {
    pub fn new() -> Self {
        let secs = rand::thread_rng().gen_range(600..660);
        StaleLockReaper { max_age: Duration::from_secs(secs) }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Scan lock files directly under `dir_prefix` and remove those older
    /// than the reaper's deadline.
    pub async fn sweep(&self, backend: &dyn RecordBackend, dir_prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for entry in backend.list_dir(dir_prefix).await? {
            if !entry.ends_with(".lock") {
                continue;
            }
            let path = if dir_prefix.is_empty() {
                entry.clone()
            } else {
                format!("{dir_prefix}/{entry}")
            };
            if let Some(mtime_nanos) = backend.modified_nanos(&path).await? {
                let age_nanos = current_nanos().saturating_sub(mtime_nanos);
                if age_nanos > self.max_age.as_nanos() {
                    backend.delete(&path).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

impl Default for StaleLockReaper {
    fn default() -> Self {
        Self::new()
    }
}
