//! Exponential backoff for transient fetch failures.
//!
//! Only 429 responses and network-level errors are retried. A 404, an
//! unexpected status, or a body that fails to classify will not change on a
//! second attempt and is returned as-is.

use std::future::Future;
use std::time::Duration;

use crate::error::ExtractError;

impl ExtractError {
    /// Rate limiting and transport errors may succeed on a later attempt.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, ExtractError::RateLimited { .. } | ExtractError::Http(_))
    }
}

/// Delay before retry number `retry` (0-based): `base * 2^retry` seconds,
/// saturating instead of overflowing.
fn delay_for(base_secs: u64, retry: u32) -> Duration {
    let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
    Duration::from_secs(base_secs.saturating_mul(factor))
}

/// Runs `operation`, retrying transient failures up to `max_retries` times.
///
/// With the default base of 1 s and 2 retries a page is attempted at most
/// three times over roughly three seconds of sleeping.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ExtractError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtractError>>,
{
    for retry in 0..max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                let delay = delay_for(backoff_base_secs, retry);
                tracing::warn!(
                    retry = retry + 1,
                    max_retries,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "transient fetch error; backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }

    // Final attempt: whatever happens is returned.
    operation().await
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays `script` one result per attempt and reports how many attempts
    /// were made.
    async fn replay(
        max_retries: u32,
        script: Vec<Result<u32, ExtractError>>,
    ) -> (Result<u32, ExtractError>, usize) {
        let remaining = Mutex::new(VecDeque::from(script));
        let attempts = Mutex::new(0usize);

        let result = retry_with_backoff(max_retries, 0, || {
            *attempts.lock().unwrap() += 1;
            let next = remaining
                .lock()
                .unwrap()
                .pop_front()
                .expect("script has enough entries");
            async move { next }
        })
        .await;

        let attempts = *attempts.lock().unwrap();
        (result, attempts)
    }

    fn throttled() -> ExtractError {
        ExtractError::RateLimited {
            domain: "www.rei.com".to_owned(),
            retry_after_secs: 0,
        }
    }

    #[test]
    fn delay_doubles_and_saturates() {
        assert_eq!(delay_for(1, 0), Duration::from_secs(1));
        assert_eq!(delay_for(1, 1), Duration::from_secs(2));
        assert_eq!(delay_for(3, 2), Duration::from_secs(12));
        assert_eq!(delay_for(2, 80), Duration::from_secs(u64::MAX));
        assert_eq!(delay_for(0, 5), Duration::ZERO);
    }

    #[tokio::test]
    async fn first_success_is_returned_without_retry() {
        let (result, attempts) = replay(3, vec![Ok(7)]).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn rate_limiting_is_retried_until_success() {
        let (result, attempts) = replay(3, vec![Err(throttled()), Err(throttled()), Ok(99)]).await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn last_error_surfaces_once_retries_run_out() {
        let script = vec![Err(throttled()), Err(throttled()), Err(throttled())];
        let (result, attempts) = replay(2, script).await;
        assert_eq!(attempts, 3);
        assert!(matches!(result, Err(ExtractError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let (result, attempts) = replay(0, vec![Err(throttled())]).await;
        assert_eq!(attempts, 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{truncated").unwrap_err();
        let permanent = vec![
            ExtractError::NotFound {
                url: "https://www.rei.com/c/gone".to_owned(),
            },
            ExtractError::UnexpectedStatus {
                status: 503,
                url: "https://www.patagonia.com/shop/web-specials".to_owned(),
            },
            ExtractError::InvalidJson {
                context: "https://www.nike.com/feed".to_owned(),
                source: bad_json,
            },
        ];

        for err in permanent {
            let label = err.to_string();
            let (result, attempts) = replay(3, vec![Err(err)]).await;
            assert_eq!(attempts, 1, "{label}");
            assert!(result.is_err());
        }
    }
}
