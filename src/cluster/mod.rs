//! Cluster query subsystem.
//!
//! # Data Flow
//! ```text
//! Service Fabric HTTP gateway
//!     → rest.rs (reqwest, JSON decoding, paging tokens)
//!     → ClusterQuery (one page per call)
//!     → context.rs (deadline + cancellation per call)
//!     → discovery (walker, label collector, endpoint resolver)
//! ```
//!
//! # Design Decisions
//! - One trait method per upstream query; paging loops live in `discovery`
//! - Calls never retry; a failed call surfaces to the poll cycle

pub mod context;
pub mod error;
pub mod rest;
pub mod types;

use async_trait::async_trait;

pub use context::{CallContext, DEFAULT_CALL_TIMEOUT};
pub use error::{ClusterError, ClusterResult};
pub use rest::RestClusterClient;
pub use types::{
    Application, ContinuationToken, Page, Partition, PartitionId, PartitionKind, Property,
    PropertyValue, Replica, Service, ServiceKind, ServiceName, ServiceTypeDescription,
};

/// Read-only cluster queries, one page at a time.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    async fn applications(
        &self,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Application>>;

    async fn services(
        &self,
        application: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Service>>;

    async fn partitions(
        &self,
        service: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Partition>>;

    async fn replicas(
        &self,
        partition: &PartitionId,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Replica>>;

    /// Description of `service_type` as declared by the application type.
    /// `None` when the type is unknown to the cluster.
    async fn service_type(
        &self,
        application_type: &str,
        application_version: &str,
        service_type: &str,
    ) -> ClusterResult<Option<ServiceTypeDescription>>;

    async fn properties(
        &self,
        name: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Property>>;
}
