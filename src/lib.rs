//! Service Fabric provider for Traefik.
//!
//! Walks a Service Fabric cluster, reads `traefik.*` labels from service
//! manifests and the property store, and publishes a Traefik dynamic
//! configuration document (file and HTTP).

pub mod admin;
pub mod cluster;
pub mod config;
pub mod discovery;
pub mod dynamic;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;

pub use cluster::{ClusterQuery, RestClusterClient};
pub use config::schema::ProviderConfig;
pub use dynamic::DynamicConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use provider::{Poller, ProviderState};
