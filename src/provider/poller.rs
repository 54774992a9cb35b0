//! Periodic poll loop.
//!
//! # Data Flow
//! ```text
//! loop:
//!     settings.load()            (hot-reloaded poll + cluster timeout)
//!     → generate (child token of the shutdown root)
//!     → emitter::render → write_atomic (optional) → ProviderState::publish
//!     → sleep interval_secs, or exit on shutdown
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

use crate::cluster::{CallContext, ClusterQuery};
use crate::config::ProviderConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::provider::emitter;
use crate::provider::generate::{generate, PollReport, ProviderError};
use crate::provider::state::ProviderState;

pub struct Poller<C: ?Sized> {
    client: Arc<C>,
    settings: Arc<ArcSwap<ProviderConfig>>,
    state: Arc<ProviderState>,
}

impl<C> Poller<C>
where
    C: ClusterQuery + ?Sized + 'static,
{
    pub fn new(
        client: Arc<C>,
        settings: Arc<ArcSwap<ProviderConfig>>,
        state: Arc<ProviderState>,
    ) -> Self {
        Self {
            client,
            settings,
            state,
        }
    }

    pub fn state(&self) -> &Arc<ProviderState> {
        &self.state
    }

    /// Run one pass and publish its result.
    ///
    /// A failed pass leaves the previously published document in place.
    pub async fn poll_once(&self, cancel: CancellationToken) -> Result<PollReport, ProviderError> {
        let started = Instant::now();
        let settings = self.settings.load_full();
        let ctx = CallContext::new(cancel, Duration::from_secs(settings.cluster.timeout_secs));

        let result = self
            .pass(ctx, settings.poll.output_path.as_deref().map(Path::new))
            .await;

        match &result {
            Ok(report) => {
                metrics::record_poll("success", started);
                tracing::info!(
                    routers = report.routers,
                    services = report.service_objects,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Poll complete"
                );
            }
            Err(e) => {
                metrics::record_poll(e.outcome(), started);
                self.state.record_failure(e);
                tracing::warn!(error = %e, "Poll failed, keeping previous document");
            }
        }
        result
    }

    async fn pass(&self, ctx: CallContext, output: Option<&Path>) -> Result<PollReport, ProviderError> {
        let (document, report) = generate(self.client.as_ref(), ctx).await?;
        let snapshot = emitter::render(&document)?;

        if let Some(path) = output {
            emitter::write_atomic(path, &snapshot.yaml).await?;
        }

        metrics::record_document(snapshot.routers, snapshot.services);
        self.state.publish(snapshot, report.clone());
        Ok(report)
    }

    /// Poll until `shutdown` triggers: one pass immediately, then one pass
    /// `poll.interval_secs` after each completed pass.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!("Poller started");

        loop {
            let _ = self.poll_once(shutdown.child_token()).await;
            if shutdown.is_triggered() {
                break;
            }

            let interval = Duration::from_secs(self.settings.load().poll.interval_secs.max(1));
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        tracing::info!("Poller stopped");
    }
}
