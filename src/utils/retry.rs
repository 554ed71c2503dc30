use std::future::Future;
use std::time::Duration;

// ============================================================================
// Start-up Retry
// ============================================================================
//
// Exponential backoff for operations that may wait: the database connection
// at boot and the test producer's publish. Only errors that report
// themselves as transient are retried. The ingestion path never goes
// through here; a failed message is dropped.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Longer schedule for dependencies that may still be booting, roughly
    /// 15 seconds in total.
    pub fn startup() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_millis(500),
            ..Self::default()
        }
    }

    /// Wait before the attempt following `attempt` (1-based), capped at
    /// `max_delay`.
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor).min(self.max_delay)
    }
}

#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Still failing after `max_attempts`.
    Failed(E),
    /// Gave up at once on a non-transient error.
    PermanentFailure(E),
}

pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently or runs out of
/// attempts. The closure gets the 1-based attempt number.
pub async fn retry_on_transient<F, Fut, T, E>(config: RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Succeeded after retry");
                }
                return RetryResult::Success(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            tracing::error!(attempt, error = %error, "Permanent failure, not retrying");
            return RetryResult::PermanentFailure(error);
        }
        if attempt >= config.max_attempts {
            tracing::error!(attempt, error = %error, "Giving up after all attempts");
            return RetryResult::Failed(error);
        }

        let delay = config.delay_after(attempt);
        tracing::warn!(
            attempt,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
