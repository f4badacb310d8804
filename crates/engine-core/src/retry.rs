use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Indicates whether a failed attempt may be tried again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Why an operation run under a [`RetryPolicy`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was not retryable.
    Fatal(E),
    /// Every allowed attempt failed with a retryable error; holds the last one.
    AttemptsExceeded { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) => err,
            RetryError::AttemptsExceeded { last, .. } => last,
        }
    }
}

/// Exponential backoff: the n-th retry waits `initial_delay * 2^n`, capped at
/// `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: if max_delay.is_zero() {
                initial_delay
            } else {
                max_delay
            },
        }
    }

    /// Default delays with a different attempt budget.
    pub fn with_attempts(max_attempts: usize) -> Self {
        let defaults = Self::default();
        Self::new(max_attempts, defaults.initial_delay, defaults.max_delay)
    }

    /// No waiting between attempts. Handy in tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0usize;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if classify(&err) == RetryDisposition::Stop {
                return Err(RetryError::Fatal(err));
            }
            if attempt >= self.max_attempts {
                return Err(RetryError::AttemptsExceeded {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.backoff_delay(attempt - 1);
            warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient failure"
            );
            sleep(delay).await;
        }
    }

    pub fn backoff_delay(&self, retry: usize) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u128 << retry.min(20);
        let delay_ms = self.initial_delay.as_millis().saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}
