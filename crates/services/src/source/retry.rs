use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config;
use crate::error::GenerationError;

pub const TIMEOUT_VAR: &str = "QUIZ_GENERATE_TIMEOUT_SECS";
pub const ATTEMPTS_VAR: &str = "QUIZ_GENERATE_ATTEMPTS";

/// Upper bound on a single generation attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Bounded retry for generator calls: per-attempt timeout, fixed attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Defaults overridden by `QUIZ_GENERATE_TIMEOUT_SECS` and `QUIZ_GENERATE_ATTEMPTS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(config::process_env)
    }

    /// Zero or unparseable values keep the default.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(secs) = config::number::<u64>(&lookup, TIMEOUT_VAR).filter(|s| *s > 0) {
            policy.attempt_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = config::number::<u32>(&lookup, ATTEMPTS_VAR).filter(|n| *n > 0) {
            policy.max_attempts = attempts;
        }
        policy
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. An attempt exceeding
    /// `attempt_timeout` is dropped and counts as `GenerationError::Timeout`.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = tokio::time::timeout(self.attempt_timeout, op(attempt))
                .await
                .unwrap_or(Err(GenerationError::Timeout));

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "generation attempt failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
