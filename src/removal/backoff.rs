//! Exponential backoff with jitter for rate-limited requests

use crate::error::{BatchError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Result of one attempt against a rate-limited service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Done(T),
    RateLimited,
}

/// Wait before retrying after attempt `attempt` (0-based) was rate limited
///
/// The delay is `2^attempt + jitter` seconds. `jitter` is expected in `[0, 1)`.
pub fn backoff_delay(attempt: u32, jitter: f64) -> Duration {
    debug_assert!((0.0..1.0).contains(&jitter), "jitter out of range: {jitter}");
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let seconds = 2f64.powi(exponent) + jitter;
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// [`backoff_delay`] with uniformly random jitter
pub fn jittered_delay(attempt: u32) -> Duration {
    let jitter: f64 = rand::thread_rng().gen();
    backoff_delay(attempt, jitter)
}

/// Drive `attempt` until it completes, fails, or `max_retries` attempts were rate limited
///
/// Each call receives the 0-based attempt index and must build its own
/// request. Errors from an attempt are returned immediately without retrying.
/// No wait follows the final attempt.
///
/// # Errors
/// - Any error returned by an attempt
/// - [`BatchError::RetryExhausted`] when every attempt was rate limited
pub async fn with_rate_limit_retry<T, F, Fut>(max_retries: u32, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    for index in 0..max_retries {
        match attempt(index).await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::RateLimited if index + 1 < max_retries => {
                let wait = jittered_delay(index);
                warn!(
                    attempt = index + 1,
                    max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited by removal API, backing off"
                );
                tokio::time::sleep(wait).await;
            },
            Attempt::RateLimited => {
                warn!(attempt = index + 1, max_retries, "Rate limited on final attempt");
            },
        }
    }

    Err(BatchError::RetryExhausted {
        attempts: max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_delay_bounds() {
        for attempt in 0..10 {
            let floor = Duration::from_secs(1 << attempt);
            let ceiling = floor + Duration::from_secs(1);
            for jitter in [0.0, 0.25, 0.5, 0.999_999] {
                let delay = backoff_delay(attempt, jitter);
                assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
                assert!(delay < ceiling, "attempt {attempt}: {delay:?} >= {ceiling:?}");
            }
        }
    }

    #[test]
    fn test_jittered_delay_stays_in_half_open_interval() {
        for attempt in 0..5 {
            let floor = Duration::from_secs(1 << attempt);
            for _ in 0..200 {
                let delay = jittered_delay(attempt);
                assert!(delay >= floor);
                assert!(delay < floor + Duration::from_secs(1));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_rate_limited_exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = with_rate_limit_retry(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Attempt::RateLimited) }
        })
        .await;

        assert!(matches!(result, Err(BatchError::RetryExhausted { attempts: 5 })));
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        // Waits follow attempts 0..=3 only: 1 + 2 + 4 + 8 seconds plus jitter
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(15), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(19), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_rate_limits() {
        let seen = std::sync::Mutex::new(Vec::new());

        let result = with_rate_limit_retry(5, |index| {
            seen.lock().unwrap().push(index);
            async move {
                if index < 2 {
                    Ok(Attempt::RateLimited)
                } else {
                    Ok(Attempt::Done(vec![1u8, 2, 3]))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, vec![1, 2, 3]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = with_rate_limit_retry(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(BatchError::Api {
                    status: 400,
                    status_text: "Bad Request".to_string(),
                    message: "invalid image".to_string(),
                    body: "invalid image".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(BatchError::Api { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_sleep() {
        let start = Instant::now();
        let result: Result<()> = with_rate_limit_retry(1, |_| async { Ok(Attempt::RateLimited) }).await;

        assert!(matches!(result, Err(BatchError::RetryExhausted { attempts: 1 })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
