//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (add / propagate x-request-id)
//!     → /config, /config.json, /healthz   (ProviderState snapshot)
//!     → /admin/*                          (admin subsystem)
//!     → anything else → passthrough.rs    (GET to the cluster API)
//! ```

pub mod passthrough;
pub mod request;
pub mod server;

pub use passthrough::Passthrough;
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
