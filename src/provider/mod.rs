//! Provider subsystem: turns the cluster into a published document.
//!
//! # Data Flow
//! ```text
//! poller.rs (interval, cancellation)
//!     → generate.rs (walk + build, failure isolation)
//!     → emitter.rs (YAML/JSON, atomic file write)
//!     → state.rs (ArcSwap snapshot read by HTTP handlers)
//! ```
//!
//! # Design Decisions
//! - Rebuild from scratch every pass; nothing is diffed against the last one
//! - A failed or cancelled pass never replaces the published document

pub mod emitter;
pub mod generate;
pub mod poller;
pub mod state;

pub use generate::{generate, PollReport, ProviderError};
pub use poller::Poller;
pub use state::{ProviderState, Snapshot, StatusReport};
