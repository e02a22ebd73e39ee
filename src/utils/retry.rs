//! Bounded retries around transient collaborator failures

use crate::utils::config::RetryPolicy;
use crate::utils::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Only errors reporting `is_transient()` are retried; the last error is returned as-is.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                attempt += 1;
                let delay = delay_with_jitter(policy, attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt - 1,
                    max_attempts,
                    e,
                    delay
                );
                sleep(delay).await;
            }
            Err(e) => {
                if e.is_transient() {
                    error!("{} failed after {} attempts: {}", label, attempt, e);
                }
                return Err(e);
            }
        }
    }
}

fn delay_with_jitter(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy.base_delay_for(attempt);
    if policy.max_jitter_ms == 0 {
        return base;
    }
    let jitter = rand::thread_rng().gen_range(0..=policy.max_jitter_ms);
    base + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ServeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 0,
            max_jitter_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_policy(3), "extract", move |_| async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(ServeError::Transient("HTTP Error 429".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_policy(2), "extract", move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ServeError::Transient("timed out".into()))
        })
        .await;

        assert!(matches!(result, Err(ServeError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_policy(3), "extract", move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ServeError::NoMatchingStream("mp3".into()))
        })
        .await;

        assert!(matches!(result, Err(ServeError::NoMatchingStream(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
            max_jitter_ms: 50,
        };
        for _ in 0..100 {
            let delay = delay_with_jitter(&policy, 2);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }
}
