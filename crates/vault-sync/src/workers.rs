//! Bounded-concurrency fan-out for uploads/downloads: a
//! pool of five workers drawing from a semaphore, collecting partial
//! successes — the operation returns the count that succeeded plus the
//! first error with the rest appended.
//!
//! `tokio::spawn` per item, bounded by a semaphore, joined and
//! aggregated, since callers here need the results rather than just
//! best-effort side effects.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{Result, SyncError};

/// Default worker count.
pub const WORKER_COUNT: usize = 5;

/// Run `make_future(item)` for every item in `items`, with concurrency
/// bounded to `WORKER_COUNT`. Returns the number that succeeded; any
/// failures are aggregated into `SyncError::PartialFailure`, with the
/// first failure as the headline error and the rest appended. If every
/// item succeeds, returns `Ok(items.len())`.
pub async fn run_bounded<T, F, Fut>(items: Vec<T>, make_future: F) -> Result<usize>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(WORKER_COUNT));
    let make_future = Arc::new(make_future);

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = Arc::clone(&semaphore);
            let make_future = Arc::clone(&make_future);
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                make_future(item).await
            })
        })
        .collect();

    let mut succeeded = 0usize;
    let mut errors = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => succeeded += 1,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "worker task failed");
                errors.push(e);
            }
            Err(join_err) => {
                tracing::warn!(error = %join_err, "worker task panicked or was cancelled");
                errors.push(SyncError::Storage(vault_storage::StorageError::Io(
                    std::io::Error::other(join_err.to_string()),
                )));
            }
        }
    }

    if errors.is_empty() {
        return Ok(succeeded);
    }
    let mut errors = errors.into_iter();
    let first_error = Box::new(errors.next().expect("checked non-empty above"));
    let rest: Vec<SyncError> = errors.collect();
    Err(SyncError::PartialFailure { succeeded, first_error, rest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_succeed_returns_count() {
        let items = vec![1, 2, 3, 4, 5, 6];
        let n = run_bounded(items, |_i| async { Ok(()) }).await.unwrap();
        assert_eq!(n, 6);
    }

    #[tokio::test]
    async fn mixed_results_aggregate_partial_failure() {
        let items = vec![1, 2, 3, 4];
        let err = run_bounded(items, |i| async move {
            if i % 2 == 0 {
                Err(SyncError::Storage(vault_storage::StorageError::NotFound(format!("item {i}"))))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap_err();

        match err {
            SyncError::PartialFailure { succeeded, rest, .. } => {
                assert_eq!(succeeded, 2);
                assert_eq!(rest.len(), 1);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn respects_bounded_concurrency() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let current = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..20).collect();
        let current2 = Arc::clone(&current);
        let max_seen2 = Arc::clone(&max_seen);
        run_bounded(items, move |_i| {
            let current = Arc::clone(&current2);
            let max_seen = Arc::clone(&max_seen2);
            async move {
                let n = current.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(n, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert!(max_seen.load(Ordering::SeqCst) <= WORKER_COUNT);
    }
}
