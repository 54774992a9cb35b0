//! Cluster discovery subsystem.
//!
//! # Data Flow
//! ```text
//! ClusterQuery (page at a time)
//!     → walker.rs (applications → services → partitions → replicas)
//!     → labels.rs (manifest extension + property store → LabelSet)
//!     → endpoints.rs (singleton partitions → replica addresses → http(s) URLs)
//!     → dynamic (config tree builder)
//! ```
//!
//! # Design Decisions
//! - Everything is lazy; nothing is fetched until a stream is polled
//! - Sequential: one outstanding cluster call at a time per poll
//! - Upstream order is preserved end to end

pub mod endpoints;
pub mod labels;
pub mod walker;

pub use endpoints::{BackendSource, EndpointResolver, ServiceEndpoints};
pub use labels::{LabelCollector, LabelSet};
pub use walker::{paginate, TopologyWalker};
