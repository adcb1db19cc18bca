//! Single retry for transient storage failures

use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::time::Duration;

use super::{StoreError, StoreResult};

/// Run `op`, repeating it once after a short backoff if the first attempt
/// fails with [`StoreError::Unavailable`]. Every other outcome is returned as is.
pub async fn retry_once<T, F, Fut>(operation: &'static str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(50))
        .with_max_interval(Duration::from_millis(500))
        .with_max_elapsed_time(Some(Duration::from_secs(2)))
        .build();

    let mut attempts = 0u32;
    backoff::future::retry_notify(
        policy,
        || {
            attempts += 1;
            let first_attempt = attempts == 1;
            let fut = op();
            async move {
                fut.await.map_err(|err| {
                    if first_attempt && err.is_retryable() {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: StoreError, wait: Duration| {
            tracing::warn!(
                operation,
                error = %err,
                retry_in_ms = wait.as_millis() as u64,
                "Storage unavailable, retrying"
            );
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_unavailable_once_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry_once("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(StoreError::Unavailable("connection reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_unavailable() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = retry_once("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Unavailable("down".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn conflicts_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = retry_once("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Conflict("duplicate".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
