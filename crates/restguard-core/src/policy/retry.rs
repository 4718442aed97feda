//! Retry policy backed by `tokio-retry` backoff strategies.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_retry::strategy::{jitter, ExponentialBackoff, FixedInterval};
use tokio_retry::RetryIf;

use super::{AsyncAction, AsyncPolicy, Erased, SyncAction, SyncPolicy};
use crate::error::{ClientError, PolicyError};

/// Decides whether a failed attempt should be retried.
pub type RetryPredicate = Arc<dyn Fn(&ClientError) -> bool + Send + Sync>;

/// Shape of the delay sequence between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `initial_backoff * multiplier^(n-1)`, capped at `max_backoff`.
    Exponential { multiplier: u64 },
    /// `initial_backoff` between every attempt.
    Fixed,
}

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    pub backoff: Backoff,
    /// Randomize each delay within `[0, delay)`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff: Backoff::Exponential { multiplier: 2 },
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Retry `max_retries` times back-to-back, without waiting.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff: Backoff::Fixed,
            jitter: false,
        }
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Retries transient failures according to a [`RetryConfig`].
///
/// Works for both blocking and async execution. By default an error is
/// retried when [`ClientError::is_transient`] says so; use
/// [`RetryPolicy::retry_if`] to change that.
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    predicate: RetryPredicate,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            predicate: Arc::new(ClientError::is_transient),
        }
    }

    /// Replace the retry predicate.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ClientError) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// The delays slept between attempts; its length is `max_retries`.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let cap = self.config.max_backoff;
        let schedule: Box<dyn Iterator<Item = Duration> + Send> = match self.config.backoff {
            Backoff::Exponential { multiplier } => {
                let base = multiplier.max(1);
                let initial_ms = millis(self.config.initial_backoff);
                // yields base, base^2, ...; scaled to initial * base^(n-1)
                Box::new(ExponentialBackoff::from_millis(base).map(move |d| {
                    Duration::from_millis(millis(d).saturating_mul(initial_ms) / base)
                }))
            }
            Backoff::Fixed => Box::new(FixedInterval::new(self.config.initial_backoff)),
        };

        let schedule = schedule.map(move |d| d.min(cap));
        let limit = self.config.max_retries as usize;
        if self.config.jitter {
            Box::new(schedule.map(jitter).take(limit))
        } else {
            Box::new(schedule.take(limit))
        }
    }

    fn give_up(&self, attempts: u32, error: ClientError) -> PolicyError {
        if (self.predicate)(&error) {
            tracing::error!(attempts, error = %error, "max retries exceeded");
            PolicyError::RetriesExhausted {
                attempts,
                last: error,
            }
        } else {
            PolicyError::Client(error)
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncPolicy for RetryPolicy {
    fn execute(&self, action: SyncAction<'_>) -> Result<Erased, PolicyError> {
        let mut delays = self.delays();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match action() {
                Ok(value) => return Ok(value),
                Err(e) if (self.predicate)(&e) => match delays.next() {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = millis(delay),
                            error = %e,
                            "retrying request"
                        );
                        std::thread::sleep(delay);
                    }
                    None => return Err(self.give_up(attempt, e)),
                },
                Err(e) => return Err(PolicyError::Client(e)),
            }
        }
    }

    fn name(&self) -> &str {
        "retry"
    }
}

#[async_trait]
impl AsyncPolicy for RetryPolicy {
    async fn execute<'a>(&self, mut action: AsyncAction<'a>) -> Result<Erased, PolicyError> {
        let attempts = AtomicU32::new(0);
        let predicate = &self.predicate;

        let result = RetryIf::start(
            self.delays(),
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                action()
            },
            |e: &ClientError| {
                let retry = predicate(e);
                if retry {
                    tracing::warn!(
                        attempt = attempts.load(Ordering::Relaxed),
                        error = %e,
                        "attempt failed"
                    );
                }
                retry
            },
        )
        .await;

        result.map_err(|e| self.give_up(attempts.load(Ordering::Relaxed), e))
    }

    fn name(&self) -> &str {
        "retry"
    }
}
