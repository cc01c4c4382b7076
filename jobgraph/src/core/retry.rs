//! Retry policy for remote calls.
//!
//! The step executor never retries on its own: a step whose remote call fails
//! with a transient error fails the run. Retrying is the client's concern, and
//! [`crate::client::RetryingClient`] applies a [`RetryPolicy`] to any client
//! using [`retry_with_policy`].
//!
//! Two things decide whether a call is retried:
//!
//! 1. The [`RetryPolicy`] controls HOW MANY attempts are made and WHEN
//!    (exponential backoff capped at `max_delay`).
//! 2. The [`RetryableError`] trait controls WHICH errors are retried.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior.
///
/// # Examples
///
/// ```
/// use jobgraph::core::RetryPolicy;
/// use std::time::Duration;
///
/// const API_RETRY: RetryPolicy = RetryPolicy {
///     max_attempts: 5,
///     initial_delay: Duration::from_millis(250),
///     max_delay: Duration::from_secs(10),
///     backoff_multiplier: 2.0,
/// };
///
/// assert_eq!(API_RETRY.delay_for_attempt(1), Some(Duration::from_millis(250)));
/// assert_eq!(API_RETRY.delay_for_attempt(5), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first try).
    ///
    /// Default: 1 (no retries)
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (caps exponential backoff).
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,

    /// Each retry delay is `min(initial_delay * backoff_multiplier^(attempt-1), max_delay)`.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// No retries - fail immediately on first error.
    pub const NONE: Self = Self {
        max_attempts: 1,
        initial_delay: Duration::from_secs(0),
        max_delay: Duration::from_secs(0),
        backoff_multiplier: 1.0,
    };

    /// Calculate the delay before the next retry attempt.
    ///
    /// `attempt` is the 1-indexed attempt that just failed. Returns `None`
    /// once the attempts are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let exponent = attempt.saturating_sub(1) as f64;
        let multiplier = self.backoff_multiplier.powf(exponent);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;

        Some(Duration::from_secs_f64(
            delay_secs.min(self.max_delay.as_secs_f64()),
        ))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Trait for error types to specify whether they should trigger a retry.
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

/// Executes a fallible operation with retry logic.
///
/// The operation receives the current attempt number (1-indexed). Errors that
/// are not retryable, or that occur after the last attempt, are returned as is.
pub async fn retry_with_policy<F, Fut, T, E>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Debug,
{
    let mut attempt = 1;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            tracing::debug!("Call failed with non-retryable error: {:?}", error);
            return Err(error);
        }

        let Some(delay) = policy.delay_for_attempt(attempt) else {
            tracing::warn!(
                "Call failed and exhausted retry attempts ({}/{}): {:?}",
                attempt,
                policy.max_attempts,
                error
            );
            return Err(error);
        };

        tracing::debug!(
            "Call failed with retryable error (attempt {}/{}): {:?}. Retrying after {:?}",
            attempt,
            policy.max_attempts,
            error,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl RetryableError for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    const FAST: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
    };

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::NONE;
        assert_eq!(policy.delay_for_attempt(1), None);
        assert_eq!(policy.delay_for_attempt(2), None);
    }

    #[test]
    fn test_retry_policy_backs_off_exponentially() {
        assert_eq!(FAST.delay_for_attempt(1), Some(Duration::from_millis(1)));
        assert_eq!(FAST.delay_for_attempt(2), Some(Duration::from_millis(2)));
        assert_eq!(FAST.delay_for_attempt(3), None);
    }

    #[test]
    fn test_retry_policy_caps_at_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 10.0,
        };
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_retry_policy_deserializes_millis() {
        let policy: RetryPolicy = serde_json::from_str(
            r#"{"max_attempts":4,"initial_delay":250,"max_delay":2000,"backoff_multiplier":2.0}"#,
        )
        .unwrap();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(FAST, |_attempt| {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    Err(TestError { retryable: true })
                } else {
                    Ok::<_, TestError>(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(FAST, |_attempt| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError { retryable: false })
            }
        })
        .await;

        assert!(!result.unwrap_err().retryable);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(FAST, |_attempt| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError { retryable: true })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
