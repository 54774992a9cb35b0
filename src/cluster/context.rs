//! Per-call deadline and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cluster::error::{ClusterError, ClusterResult};
use crate::observability::metrics;

/// Default bound on a single cluster round-trip.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline and cancellation shared by every call of one poll cycle.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Duration,
}

impl CallContext {
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one cluster call under the deadline, aborting on cancellation.
    pub async fn call<T, F>(&self, fut: F) -> ClusterResult<T>
    where
        F: Future<Output = ClusterResult<T>>,
    {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClusterError::Cancelled),
            res = tokio::time::timeout(self.timeout, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(ClusterError::Timeout(self.timeout)),
            },
        };

        metrics::record_cluster_call(match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        });
        result
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new(CancellationToken::new(), DEFAULT_CALL_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_passes_result_through() {
        let ctx = CallContext::default();
        let value = ctx.call(async { Ok::<_, ClusterError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let ctx = CallContext::new(CancellationToken::new(), Duration::from_millis(20));
        let err = ctx
            .call(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ClusterError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_call_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = CallContext::new(token.clone(), Duration::from_secs(5));
        token.cancel();
        let err = ctx
            .call(async { Ok::<_, ClusterError>(()) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
