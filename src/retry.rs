//! Bounded retry with exponential backoff.
//!
//! Every operation retried here is a read, so retrying any classified
//! failure cannot double-apply anything.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sui_interface_types::RetryConfig;

use crate::cancel::CancelToken;
use crate::error::{ErrorKind, FetchError, FetchResult};

/// Observer invoked before each backoff wait with `(error, failed_attempt, delay)`.
pub type RetryObserver = Arc<dyn Fn(&FetchError, u32, Duration) + Send + Sync>;

/// Retry configuration plus an optional observer.
#[derive(Clone, Default)]
pub struct RetryPolicy {
    pub config: RetryConfig,
    on_retry: Option<RetryObserver>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config)
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            on_retry: None,
        }
    }

    /// Replace the default `tracing` observer.
    pub fn with_on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&FetchError, u32, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Attempts per call; never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    pub fn should_retry(&self, error: &FetchError) -> bool {
        match error.kind() {
            ErrorKind::InputValidation | ErrorKind::Cancelled => false,
            ErrorKind::PackageNotFound | ErrorKind::ModuleNotFound => self.config.retry_not_found,
            ErrorKind::RpcRateLimited | ErrorKind::RpcTimeout | ErrorKind::ConnectionFailed => {
                true
            }
        }
    }

    fn notify(&self, error: &FetchError, attempt: u32, delay: Duration) {
        match &self.on_retry {
            Some(observer) => observer(error, attempt, delay),
            None => tracing::warn!(
                kind = %error.kind(),
                attempt,
                max_attempts = self.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                "retrying after error: {}",
                error
            ),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts()` attempts have failed.
///
/// `op` receives the 1-based attempt number. Cancellation observed during an
/// attempt or a backoff wait returns [`FetchError::Cancelled`] at once and is
/// not reported to the observer.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> FetchResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1u32;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = op(attempt) => result,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt >= max_attempts || !policy.should_retry(&error) {
            return Err(error);
        }

        let delay = policy.config.delay_for(attempt);
        policy.notify(&error, attempt, delay);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use sui_interface_types::Network;
    use tokio::time::Instant;

    fn rate_limited() -> FetchError {
        FetchError::RpcRateLimited {
            endpoint: "mock".to_string(),
        }
    }

    fn recording_policy(config: RetryConfig) -> (RetryPolicy, Arc<Mutex<Vec<(u32, Duration)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let policy = RetryPolicy::new(config).with_on_retry(move |_, attempt, delay| {
            sink.lock().push((attempt, delay));
        });
        (policy, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_kth_attempt() {
        let (policy, seen) = recording_policy(RetryConfig::new(5, 100, 10_000));
        let calls = AtomicU32::new(0);
        let k = 3;

        let result = with_retries(&policy, &CancelToken::never(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < k {
                    Err(rate_limited())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let seen = seen.lock().clone();
        assert_eq!(
            seen,
            vec![
                (1, Duration::from_millis(100)),
                (2, Duration::from_millis(200)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let (policy, seen) = recording_policy(RetryConfig::new(4, 10, 1000));
        let calls = AtomicU32::new(0);

        let result: FetchResult<()> = with_retries(&policy, &CancelToken::never(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(FetchError::ConnectionFailed {
                    endpoint: "mock".to_string(),
                    cause: format!("attempt {}", attempt),
                })
            }
        })
        .await;

        assert_eq!(
            result,
            Err(FetchError::ConnectionFailed {
                endpoint: "mock".to_string(),
                cause: "attempt 4".to_string(),
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let attempts: Vec<u32> = seen.lock().iter().map(|(a, _)| *a).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let policy = RetryPolicy::new(RetryConfig::new(3, 100, 10_000)).with_on_retry(|_, _, _| {});
        let start = Instant::now();
        let _: FetchResult<()> =
            with_retries(&policy, &CancelToken::never(), |_| async { Err(rate_limited()) }).await;
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_retried_by_default() {
        let (policy, seen) = recording_policy(RetryConfig::new(3, 1, 10));
        let result: FetchResult<()> = with_retries(&policy, &CancelToken::never(), |_| async {
            Err(FetchError::PackageNotFound {
                package_id: "0x1".to_string(),
                network: Network::Mainnet,
            })
        })
        .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_fails_fast_when_disabled() {
        let mut config = RetryConfig::new(3, 1, 10);
        config.retry_not_found = false;
        let (policy, seen) = recording_policy(config);
        let calls = AtomicU32::new(0);

        let result: FetchResult<()> = with_retries(&policy, &CancelToken::never(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FetchError::PackageNotFound {
                    package_id: "0x1".to_string(),
                    network: Network::Mainnet,
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_treated_as_one() {
        let (policy, seen) = recording_policy(RetryConfig::new(0, 1, 10));
        let calls = AtomicU32::new(0);
        let _: FetchResult<()> = with_retries(&policy, &CancelToken::never(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let (policy, seen) = recording_policy(RetryConfig::new(5, 1000, 10_000));
        let (handle, token) = cancel_pair();
        let calls = Arc::new(AtomicU32::new(0));

        let task = {
            let calls = Arc::clone(&calls);
            let policy = policy.clone();
            tokio::spawn(async move {
                with_retries(&policy, &token, |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(rate_limited()) }
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel();

        assert_eq!(task.await.unwrap(), Err(FetchError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_attempt_is_not_reported() {
        let (policy, seen) = recording_policy(RetryConfig::new(5, 10, 100));
        let token = CancelToken::never().with_deadline(Instant::now() + Duration::from_millis(50));

        let result: FetchResult<()> = with_retries(&policy, &token, |_| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(FetchError::Cancelled));
        assert!(seen.lock().is_empty());
    }
}
