use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Retry Policy
// ============================================================================
//
// Retries an async operation while its error is transient, waiting the
// same delay between attempts.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryConfig {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Whether an error is worth another attempt.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a transient error
    Exhausted { error: E, attempts: u32 },
    /// Stopped early on a non-transient error
    Permanent { error: E, attempts: u32 },
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget is spent. The closure receives the 1-based attempt number.
pub async fn retry_on_transient<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt = attempt, "Operation succeeded after retry");
                }
                return RetryOutcome::Success { value, attempts: attempt };
            }
            Err(error) => {
                if !error.is_transient() {
                    tracing::error!(
                        attempt = attempt,
                        error = %error,
                        "Permanent failure detected, not retrying"
                    );
                    return RetryOutcome::Permanent { error, attempts: attempt };
                }

                if attempt >= config.max_attempts {
                    tracing::error!(
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retries"
                    );
                    return RetryOutcome::Exhausted { error, attempts: attempt };
                }

                let delay = config.delay;
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying after delay"
                );

                sleep(delay).await;
            }
        }
    }
}
