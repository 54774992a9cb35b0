//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use traefik_fabric::cluster::{
    Application, ClusterError, ClusterQuery, ClusterResult, ContinuationToken, Page, Partition,
    PartitionId, PartitionKind, Property, PropertyValue, Replica, Service, ServiceKind,
    ServiceName, ServiceTypeDescription,
};

pub const LABEL_NS: &str = "http://schemas.microsoft.com/2015/03/fabact-no-schema";

/// Manifest extension document carrying `labels`.
pub fn manifest(labels: &[(&str, &str)]) -> String {
    let body: String = labels
        .iter()
        .map(|(k, v)| format!("<Label Key=\"{}\">{}</Label>", k, v))
        .collect();
    format!("<Labels xmlns=\"{}\">{}</Labels>", LABEL_NS, body)
}

/// Replica address payload with the given named endpoints.
pub fn address(endpoints: &[(&str, &str)]) -> String {
    let entries: Vec<String> = endpoints
        .iter()
        .map(|(name, url)| format!("\"{}\":\"{}\"", name, url))
        .collect();
    format!("{{\"Endpoints\":{{{}}}}}", entries.join(","))
}

/// In-memory cluster serving fixed-size pages.
pub struct FakeCluster {
    page_size: usize,
    applications: Vec<Application>,
    services: HashMap<String, Vec<Service>>,
    partitions: HashMap<String, Vec<Partition>>,
    replicas: HashMap<String, Vec<Replica>>,
    service_types: HashMap<(String, String, String), ServiceTypeDescription>,
    properties: HashMap<String, Vec<Property>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            page_size: 2,
            applications: Vec::new(),
            services: HashMap::new(),
            partitions: HashMap::new(),
            replicas: HashMap::new(),
            service_types: HashMap::new(),
            properties: HashMap::new(),
            failing: Mutex::new(HashSet::new()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn application(mut self, name: &str, type_name: &str) -> Self {
        self.applications.push(Application {
            name: ServiceName::parse(name),
            type_name: type_name.to_string(),
            type_version: "1.0.0".to_string(),
        });
        self
    }

    /// Adds a service with one singleton partition and one replica per address.
    pub fn stateless(mut self, app: &str, name: &str, type_name: &str, addresses: &[String]) -> Self {
        self.push_service(app, name, type_name, ServiceKind::Stateless);
        let partition = format!("{}-p0", name);
        self.partitions.entry(ServiceName::parse(name).id()).or_default().push(Partition {
            id: PartitionId(partition.clone()),
            kind: PartitionKind::Singleton,
        });
        self.replicas.entry(partition).or_default().extend(
            addresses.iter().map(|a| Replica { address: a.clone() }),
        );
        self
    }

    pub fn stateful(mut self, app: &str, name: &str, type_name: &str) -> Self {
        self.push_service(app, name, type_name, ServiceKind::Stateful);
        self
    }

    fn push_service(&mut self, app: &str, name: &str, type_name: &str, kind: ServiceKind) {
        self.services.entry(ServiceName::parse(app).id()).or_default().push(Service {
            name: ServiceName::parse(name),
            type_name: type_name.to_string(),
            kind,
        });
    }

    pub fn partition(mut self, service: &str, id: &str, kind: PartitionKind, addresses: &[String]) -> Self {
        self.partitions.entry(ServiceName::parse(service).id()).or_default().push(Partition {
            id: PartitionId(id.to_string()),
            kind,
        });
        self.replicas.entry(id.to_string()).or_default().extend(
            addresses.iter().map(|a| Replica { address: a.clone() }),
        );
        self
    }

    pub fn manifest_labels(mut self, app_type: &str, service_type: &str, labels: &[(&str, &str)]) -> Self {
        let mut extensions = IndexMap::new();
        extensions.insert("Traefik2".to_string(), manifest(labels));
        self.service_types.insert(
            (app_type.to_string(), "1.0.0".to_string(), service_type.to_string()),
            ServiceTypeDescription { extensions },
        );
        self
    }

    pub fn property(mut self, service: &str, name: &str, value: &str) -> Self {
        self.properties
            .entry(ServiceName::parse(service).id())
            .or_default()
            .push(Property::string(name, value));
        self
    }

    pub fn binary_property(mut self, service: &str, name: &str) -> Self {
        self.properties
            .entry(ServiceName::parse(service).id())
            .or_default()
            .push(Property {
                name: name.to_string(),
                value: PropertyValue::Other,
            });
        self
    }

    /// Fail every query scoped to `key` (`applications`, or a name/partition id).
    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.failing.lock().unwrap().remove(key);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str) -> ClusterResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(key) {
            return Err(ClusterError::Status {
                status: 500,
                path: key.to_string(),
            });
        }
        Ok(())
    }

    fn page<T: Clone>(&self, items: &[T], continuation: Option<ContinuationToken>) -> Page<T> {
        let start: usize = continuation
            .map(|t| t.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        let next = (end < items.len()).then(|| ContinuationToken(end.to_string()));
        Page::new(slice, next)
    }
}

#[async_trait]
impl ClusterQuery for FakeCluster {
    async fn applications(&self, continuation: Option<ContinuationToken>) -> ClusterResult<Page<Application>> {
        self.enter("applications").await?;
        Ok(self.page(&self.applications, continuation))
    }

    async fn services(
        &self,
        application: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Service>> {
        self.enter(&application.id()).await?;
        let items = self.services.get(&application.id()).cloned().unwrap_or_default();
        Ok(self.page(&items, continuation))
    }

    async fn partitions(
        &self,
        service: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Partition>> {
        self.enter(&service.id()).await?;
        let items = self.partitions.get(&service.id()).cloned().unwrap_or_default();
        Ok(self.page(&items, continuation))
    }

    async fn replicas(
        &self,
        partition: &PartitionId,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Replica>> {
        self.enter(&partition.0).await?;
        let items = self.replicas.get(&partition.0).cloned().unwrap_or_default();
        Ok(self.page(&items, continuation))
    }

    async fn service_type(
        &self,
        application_type: &str,
        application_version: &str,
        service_type: &str,
    ) -> ClusterResult<Option<ServiceTypeDescription>> {
        self.enter(service_type).await?;
        Ok(self
            .service_types
            .get(&(
                application_type.to_string(),
                application_version.to_string(),
                service_type.to_string(),
            ))
            .cloned())
    }

    async fn properties(
        &self,
        name: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Property>> {
        self.enter(&format!("properties:{}", name.id())).await?;
        let items = self.properties.get(&name.id()).cloned().unwrap_or_default();
        Ok(self.page(&items, continuation))
    }
}

/// Start a mock HTTP server on an ephemeral port.
///
/// Each response body is the raw request head the server received.
pub async fn start_echo_backend(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nX-Upstream: fabric\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    head.len(),
                    head
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
