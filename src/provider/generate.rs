//! One full pass over the cluster.
//!
//! # Data Flow
//! ```text
//! applications ─→ services ─→ LabelCollector ─→ build_service ─→ DynamicConfig::merge
//!                                  (EndpointResolver as the backend source)
//! ```
//!
//! # Design Decisions
//! - Sequential: one service at a time, in walk order
//! - Failing to list applications aborts the pass; any other failure only
//!   drops the application or service it happened in
//! - Cancellation always aborts the pass and discards the partial document

use futures_util::StreamExt;
use serde::Serialize;
use thiserror::Error;

use crate::cluster::{Application, CallContext, ClusterError, ClusterQuery, Service};
use crate::discovery::{EndpointResolver, LabelCollector, TopologyWalker};
use crate::dynamic::{build_service, DynamicConfig, ServiceContribution};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to enumerate applications: {0}")]
    Applications(#[source] ClusterError),

    #[error("poll cancelled")]
    Cancelled,

    #[error("failed to write document: {0}")]
    Emit(#[from] std::io::Error),

    #[error("failed to render YAML: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("failed to render JSON: {0}")]
    RenderJson(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn outcome(&self) -> &'static str {
        match self {
            ProviderError::Cancelled => "cancelled",
            _ => "failure",
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub applications: usize,
    pub applications_skipped: usize,
    pub services: usize,
    pub services_enabled: usize,
    pub services_ineligible: usize,
    pub services_failed: usize,
    pub routers: usize,
    pub service_objects: usize,
}

/// Walk the cluster once and build the document.
pub async fn generate<C>(
    client: &C,
    ctx: CallContext,
) -> Result<(DynamicConfig, PollReport), ProviderError>
where
    C: ClusterQuery + ?Sized,
{
    let walker = TopologyWalker::new(client, ctx);
    let collector = LabelCollector::new(&walker);
    let resolver = EndpointResolver::new(&walker);

    let mut document = DynamicConfig::new();
    let mut report = PollReport::default();

    let mut applications = walker.applications();
    while let Some(application) = applications.next().await {
        let application = application.map_err(|e| match e {
            ClusterError::Cancelled => ProviderError::Cancelled,
            e => ProviderError::Applications(e),
        })?;
        report.applications += 1;

        let mut services = walker.services(&application.name);
        while let Some(service) = services.next().await {
            let service = match service {
                Ok(service) => service,
                Err(ClusterError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(e) => {
                    tracing::warn!(application = %application.name, error = %e, "Failed to list services, skipping application");
                    report.applications_skipped += 1;
                    break;
                }
            };
            report.services += 1;

            match contribution(&collector, &resolver, &application, &service).await {
                Ok(Some(c)) => {
                    report.services_enabled += 1;
                    document.merge(c);
                }
                Ok(None) => {}
                Err(ClusterError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(e) => {
                    tracing::warn!(service = %service.name, error = %e, "Failed to build service, skipping");
                    metrics::record_service_skipped("cluster_error");
                    report.services_failed += 1;
                }
            }
        }
    }

    report.services_ineligible = report.services - report.services_enabled - report.services_failed;
    report.routers = document.router_count();
    report.service_objects = document.service_count();

    tracing::debug!(
        applications = report.applications,
        services = report.services,
        enabled = report.services_enabled,
        routers = report.routers,
        service_objects = report.service_objects,
        "Cluster walk complete"
    );
    Ok((document, report))
}

async fn contribution<C>(
    collector: &LabelCollector<'_, '_, C>,
    resolver: &EndpointResolver<'_, '_, C>,
    application: &Application,
    service: &Service,
) -> Result<Option<ServiceContribution>, ClusterError>
where
    C: ClusterQuery + ?Sized,
{
    let Some(labels) = collector.collect(application, service).await? else {
        tracing::trace!(service = %service.name, kind = ?service.kind, "Skipping non-stateless service");
        metrics::record_service_skipped("not_stateless");
        return Ok(None);
    };

    if !labels.is_enabled() {
        metrics::record_service_skipped("not_enabled");
        return Ok(None);
    }

    build_service(&service.name, &labels, &resolver.for_service(&service.name)).await
}
