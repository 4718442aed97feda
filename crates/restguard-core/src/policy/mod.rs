//! Policy engine: resilience strategies that wrap request execution.
//!
//! A policy receives a zero-argument action and decides how (and how often)
//! to run it:
//! ```text
//! caller → PolicyGuardedClient → [SyncPolicy | AsyncPolicy] → action → RestClient
//! ```
//!
//! Actions are type-erased (`Box<dyn Any + Send>`) so policies stay
//! object-safe; [`run_sync`] and [`run_async`] restore the concrete type.

use std::any::Any;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{ClientError, PolicyError};

pub mod retry;
pub mod timeout;

pub use retry::{Backoff, RetryConfig, RetryPolicy, RetryPredicate};
pub use timeout::TimeoutPolicy;

/// Type-erased action output.
pub type Erased = Box<dyn Any + Send>;

/// A synchronous action a policy may invoke any number of times.
pub type SyncAction<'a> = &'a mut dyn FnMut() -> Result<Erased, ClientError>;

/// An asynchronous action; every call produces a fresh attempt.
pub type AsyncAction<'a> =
    Box<dyn FnMut() -> BoxFuture<'a, Result<Erased, ClientError>> + Send + 'a>;

/// A resilience strategy for blocking execution.
pub trait SyncPolicy: Send + Sync {
    /// Run `action` under this policy and return what the policy yields.
    fn execute(&self, action: SyncAction<'_>) -> Result<Erased, PolicyError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "sync-policy"
    }
}

/// A resilience strategy for async execution.
#[async_trait]
pub trait AsyncPolicy: Send + Sync {
    async fn execute<'a>(&self, action: AsyncAction<'a>) -> Result<Erased, PolicyError>;

    fn name(&self) -> &str {
        "async-policy"
    }
}

fn restore<T: 'static>(value: Erased) -> Result<T, PolicyError> {
    value
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| PolicyError::UnexpectedOutput)
}

/// Execute `f` under a synchronous policy.
pub fn run_sync<T, F>(policy: &dyn SyncPolicy, mut f: F) -> Result<T, PolicyError>
where
    T: Send + 'static,
    F: FnMut() -> Result<T, ClientError>,
{
    let mut action = || f().map(|v| Box::new(v) as Erased);
    let out = policy.execute(&mut action)?;
    restore(out)
}

/// Execute `f` under an asynchronous policy.
pub async fn run_async<'a, T, F, Fut>(policy: &dyn AsyncPolicy, mut f: F) -> Result<T, PolicyError>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'a,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'a,
{
    let action: AsyncAction<'a> = Box::new(move || {
        let attempt = f();
        let erased: BoxFuture<'a, Result<Erased, ClientError>> =
            Box::pin(async move { attempt.await.map(|v| Box::new(v) as Erased) });
        erased
    });
    let out = policy.execute(action).await?;
    restore(out)
}

/// Runs the action exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPolicy;

impl SyncPolicy for NoOpPolicy {
    fn execute(&self, action: SyncAction<'_>) -> Result<Erased, PolicyError> {
        action().map_err(PolicyError::Client)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[async_trait]
impl AsyncPolicy for NoOpPolicy {
    async fn execute<'a>(&self, mut action: AsyncAction<'a>) -> Result<Erased, PolicyError> {
        action().await.map_err(PolicyError::Client)
    }

    fn name(&self) -> &str {
        "noop"
    }
}
