//! Latest published document and poll statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use serde::Serialize;

use crate::provider::generate::{PollReport, ProviderError};

/// A rendered document from one successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub yaml: String,
    pub json: String,
    /// Seconds since the Unix epoch.
    pub generated_at: u64,
    pub routers: usize,
    pub services: usize,
}

/// Shared between the poller (single writer) and HTTP handlers.
#[derive(Debug, Default)]
pub struct ProviderState {
    snapshot: ArcSwapOption<Snapshot>,
    last_report: ArcSwapOption<PollReport>,
    last_error: ArcSwapOption<String>,
    polls: AtomicU64,
    failures: AtomicU64,
}

/// Body of `GET /admin/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub ready: bool,
    pub polls: u64,
    pub failures: u64,
    pub generated_at: Option<u64>,
    pub routers: usize,
    pub services: usize,
    pub last_error: Option<String>,
    pub last_poll: Option<PollReport>,
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl ProviderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest successful document, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot.load().is_some()
    }

    pub fn publish(&self, snapshot: Snapshot, report: PollReport) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.snapshot.store(Some(Arc::new(snapshot)));
        self.last_report.store(Some(Arc::new(report)));
        self.last_error.store(None);
    }

    /// Record a failed pass; the previous snapshot stays published.
    pub fn record_failure(&self, error: &ProviderError) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.last_error.store(Some(Arc::new(error.to_string())));
    }

    pub fn status(&self) -> StatusReport {
        let guard = self.snapshot.load();
        let snapshot = guard.as_deref();
        StatusReport {
            ready: snapshot.is_some(),
            polls: self.polls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            generated_at: snapshot.map(|s| s.generated_at),
            routers: snapshot.map_or(0, |s| s.routers),
            services: snapshot.map_or(0, |s| s.services),
            last_error: self.last_error.load().as_deref().cloned(),
            last_poll: self.last_report.load().as_deref().cloned(),
        }
    }
}
