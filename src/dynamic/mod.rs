//! Dynamic configuration document.
//!
//! # Data Flow
//! ```text
//! LabelSet + BackendSource
//!     → builder.rs (label grammar from schema.rs, defaults, cross-links)
//!     → ServiceContribution
//!     → DynamicConfig (ConfigNode tree from node.rs)
//!     → YAML / JSON
//! ```
//!
//! # Design Decisions
//! - Every mapping keeps insertion order; nothing is sorted
//! - Contributions are built per service and merged by a single writer

pub mod builder;
pub mod node;
pub mod schema;

pub use builder::{build_service, DynamicConfig, ServiceContribution, ROUTER_PREFIX, SERVICE_PREFIX};
pub use node::ConfigNode;
pub use schema::{LabelRule, Segment, ValueKind, ROUTER_RULES, SERVICE_RULES};
