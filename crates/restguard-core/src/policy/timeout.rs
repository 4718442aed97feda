//! Optimistic timeout for async execution.

use std::time::Duration;

use async_trait::async_trait;

use super::{AsyncAction, AsyncPolicy, Erased};
use crate::error::PolicyError;

/// Abandons the action once `timeout` has elapsed.
///
/// The in-flight attempt is dropped, which cancels it at its next await point.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    timeout: Duration,
}

impl TimeoutPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl AsyncPolicy for TimeoutPolicy {
    async fn execute<'a>(&self, mut action: AsyncAction<'a>) -> Result<Erased, PolicyError> {
        match tokio::time::timeout(self.timeout, action()).await {
            Ok(result) => result.map_err(PolicyError::Client),
            Err(_) => {
                let ms = super::retry::millis(self.timeout);
                tracing::warn!(timeout_ms = ms, "policy timeout elapsed");
                Err(PolicyError::Timeout { ms })
            }
        }
    }

    fn name(&self) -> &str {
        "timeout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::policy::run_async;

    #[tokio::test]
    async fn fast_action_passes_through() {
        let policy = TimeoutPolicy::new(Duration::from_secs(5));
        let out = run_async(&policy, || async { Ok::<_, ClientError>(7) })
            .await
            .unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_action_times_out() {
        let policy = TimeoutPolicy::new(Duration::from_millis(50));
        let err = run_async(&policy, || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ClientError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PolicyError::Timeout { ms: 50 }));
    }
}
