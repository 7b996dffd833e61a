//! Atomic single-file write: write to `<name>.tmp-<nanos>` exclusively,
//! then rename onto the final path. The rename is the commit point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::RecordBackend;
use crate::error::Result;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn nanos_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // a monotonic counter is folded in so two writes landing in the same
    // nanosecond (coarse clocks) still get distinct tmp names.
    let bump = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{now}-{bump}")
}

/// Atomically write `data` to `name` via a temp file + rename.
pub async fn save(backend: &dyn RecordBackend, name: &str, data: &[u8]) -> Result<()> {
    let tmp = format!("{name}.tmp-{}", nanos_suffix());
    backend.create_exclusive(&tmp, data).await?;
    backend.rename(&tmp, name).await?;
    Ok(())
}

/// Copy `name`'s current contents to a timestamped backup sibling,
/// returning the backup's path. Used by the multi-file transaction before
/// it starts overwriting live files.
pub async fn backup(backend: &dyn RecordBackend, name: &str) -> Result<String> {
    let backup_path = format!("{name}.bck-{}", nanos_suffix());
    backend.link_or_copy(name, &backup_path).await?;
    Ok(backup_path)
}

/// Restore `name` from a previously taken `backup_path`.
pub async fn restore(backend: &dyn RecordBackend, name: &str, backup_path: &str) -> Result<()> {
    backend.rename(backup_path, name).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryRecordBackend;

    #[tokio::test]
    async fn save_then_read() {
        let backend = MemoryRecordBackend::new();
        save(&backend, "hh/hhhh", b"value").await.unwrap();
        assert_eq!(backend.read("hh/hhhh").await.unwrap(), b"value");
    }

    #[tokio::test]
    async fn backup_and_restore_roundtrip() {
        let backend = MemoryRecordBackend::new();
        save(&backend, "rec", b"original").await.unwrap();
        let bck = backup(&backend, "rec").await.unwrap();
        save(&backend, "rec", b"modified").await.unwrap();
        assert_eq!(backend.read("rec").await.unwrap(), b"modified");
        restore(&backend, "rec", &bck).await.unwrap();
        assert_eq!(backend.read("rec").await.unwrap(), b"original");
    }
}
