//! Timeout and retry wrapper for remote model calls

use std::future::Future;
use std::time::Duration;

use super::AiError;

/// How long a call may take and how often an overloaded call is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wall-clock deadline for a single attempt
    pub timeout: Duration,
    /// Retries after the first attempt; only overload errors are retried
    pub retries: u32,
    /// Delay before the first retry, doubled for each following one
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            retries: 2,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// Runs `call` under the policy.
///
/// Each attempt is raced against the deadline with `tokio::time::timeout`;
/// an attempt that loses the race is dropped, so its result can never be
/// observed. Overload errors are retried with exponential backoff until the
/// budget runs out, every other error is returned immediately.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout(policy.timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_overloaded() => {
                if attempt > policy.retries {
                    tracing::warn!(operation, attempt, "model still overloaded, giving up");
                    return Err(match err {
                        AiError::Overloaded(msg) => AiError::Overloaded(msg),
                        other => AiError::Overloaded(other.to_string()),
                    });
                }
                tracing::warn!(
                    operation,
                    attempt,
                    remaining = policy.retries - attempt + 1,
                    "model overloaded, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(err) => {
                tracing::debug!(operation, attempt, error = %err, "call failed");
                return Err(err);
            }
        }
    }
}
