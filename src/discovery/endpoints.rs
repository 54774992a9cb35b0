//! Backend address resolution.
//!
//! # Responsibilities
//! - Walk the singleton partitions of a service and their replicas
//! - Decode each replica's address payload (`{"Endpoints": {...}}`)
//! - Pick the named endpoint (or the first one) and keep http(s) URLs only

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::cluster::{ClusterQuery, ClusterResult, PartitionKind, ServiceName};
use crate::discovery::walker::TopologyWalker;

#[derive(Debug, Deserialize)]
struct AddressPayload {
    #[serde(rename = "Endpoints")]
    endpoints: serde_json::Map<String, Value>,
}

/// Select one URL from a replica address payload.
///
/// Returns `None` when the payload is malformed, the named endpoint is
/// missing, or the selected value is not a string.
pub fn select_endpoint(address: &str, endpoint: Option<&str>) -> Option<String> {
    let payload: AddressPayload = match serde_json::from_str(address) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable replica address");
            return None;
        }
    };

    let value = match endpoint {
        Some(name) => payload.endpoints.get(name)?,
        None => payload.endpoints.values().next()?,
    };
    value.as_str().map(str::to_string)
}

/// Whether the address is an absolute http or https URL.
pub fn is_http_address(address: &str) -> bool {
    Url::parse(address)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Resolves services to proxyable backend addresses.
pub struct EndpointResolver<'w, 'a, C: ?Sized> {
    walker: &'w TopologyWalker<'a, C>,
}

impl<'w, 'a, C> EndpointResolver<'w, 'a, C>
where
    C: ClusterQuery + ?Sized,
{
    pub fn new(walker: &'w TopologyWalker<'a, C>) -> Self {
        Self { walker }
    }

    /// Addresses of `service`, in partition then replica order.
    pub fn addresses(
        &self,
        service: &ServiceName,
        endpoint: Option<&str>,
    ) -> BoxStream<'w, ClusterResult<String>> {
        let walker = self.walker;
        let service = service.clone();
        let endpoint = endpoint.map(str::to_string);

        Box::pin(async_stream::try_stream! {
            let mut partitions = walker.partitions(&service);
            while let Some(partition) = partitions.next().await {
                let partition = partition?;
                if partition.kind != PartitionKind::Singleton {
                    tracing::trace!(service = %service, partition = %partition.id, "Skipping non-singleton partition");
                    continue;
                }

                let mut replicas = walker.replicas(&partition.id);
                while let Some(replica) = replicas.next().await {
                    let replica = replica?;
                    let Some(address) = select_endpoint(&replica.address, endpoint.as_deref()) else {
                        continue;
                    };
                    if is_http_address(&address) {
                        yield address;
                    } else {
                        tracing::debug!(service = %service, address = %address, "Dropping non-HTTP endpoint");
                    }
                }
            }
        })
    }

    /// Binds the resolver to one service.
    pub fn for_service(&self, service: &ServiceName) -> ServiceEndpoints<'_, 'w, 'a, C> {
        ServiceEndpoints {
            resolver: self,
            service: service.clone(),
        }
    }
}

/// Source of backend URLs for the service objects of one cluster service.
#[async_trait]
pub trait BackendSource: Send + Sync {
    async fn backends(&self, endpoint: Option<&str>) -> ClusterResult<Vec<String>>;
}

/// An `EndpointResolver` bound to a single service.
pub struct ServiceEndpoints<'r, 'w, 'a, C: ?Sized> {
    resolver: &'r EndpointResolver<'w, 'a, C>,
    service: ServiceName,
}

#[async_trait]
impl<'r, 'w, 'a, C> BackendSource for ServiceEndpoints<'r, 'w, 'a, C>
where
    C: ClusterQuery + ?Sized,
{
    async fn backends(&self, endpoint: Option<&str>) -> ClusterResult<Vec<String>> {
        self.resolver
            .addresses(&self.service, endpoint)
            .try_collect()
            .await
    }
}
