//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router serving the generated document
//! - Mount admin routes when enabled
//! - Forward everything else to the cluster API (GET passthrough)
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until shutdown, then drain

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::admin;
use crate::config::ProviderConfig;
use crate::http::passthrough::{passthrough_handler, Passthrough};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::provider::ProviderState;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ArcSwap<ProviderConfig>>,
    pub provider: Arc<ProviderState>,
    pub passthrough: Arc<Passthrough>,
}

/// HTTP server for the provider.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over shared settings and provider state.
    pub fn new(
        settings: Arc<ArcSwap<ProviderConfig>>,
        provider: Arc<ProviderState>,
    ) -> Result<Self, url::ParseError> {
        let config = settings.load_full();
        let base = Url::parse(&config.cluster.endpoint)?;

        let state = AppState {
            settings,
            provider,
            passthrough: Arc::new(Passthrough::new(base)),
        };

        Ok(Self {
            router: Self::build_router(&config, state),
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProviderConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/config", get(config_yaml))
            .route("/config.json", get(config_json))
            .route("/healthz", get(healthz));

        if config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }

        router
            .fallback(passthrough_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` triggers.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn not_ready() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "No configuration generated yet").into_response()
}

async fn config_yaml(State(state): State<AppState>) -> Response {
    match state.provider.snapshot() {
        Some(snapshot) => (
            [(header::CONTENT_TYPE, "application/yaml")],
            snapshot.yaml.clone(),
        )
            .into_response(),
        None => not_ready(),
    }
}

async fn config_json(State(state): State<AppState>) -> Response {
    match state.provider.snapshot() {
        Some(snapshot) => (
            [(header::CONTENT_TYPE, "application/json")],
            snapshot.json.clone(),
        )
            .into_response(),
        None => not_ready(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{PollReport, Snapshot};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn server(config: ProviderConfig) -> (HttpServer, Arc<ProviderState>) {
        let provider = Arc::new(ProviderState::new());
        let settings = Arc::new(ArcSwap::from_pointee(config));
        (HttpServer::new(settings, provider.clone()).unwrap(), provider)
    }

    async fn get(router: Router, path: &str) -> Response {
        router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_config_unavailable_before_first_poll() {
        let (server, _) = server(ProviderConfig::default());
        let response = get(server.router(), "/config").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_config_served_after_publish() {
        let (server, provider) = server(ProviderConfig::default());
        provider.publish(
            Snapshot {
                yaml: "{}\n".to_string(),
                json: "{}".to_string(),
                generated_at: 1,
                routers: 0,
                services: 0,
            },
            PollReport::default(),
        );

        let response = get(server.router(), "/config").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/yaml"
        );

        let response = get(server.router(), "/config.json").await;
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_healthz_and_disabled_passthrough() {
        let mut config = ProviderConfig::default();
        config.passthrough.enabled = false;
        let (server, _) = server(config);

        assert_eq!(get(server.router(), "/healthz").await.status(), StatusCode::OK);
        assert_eq!(
            get(server.router(), "/Applications").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_admin_not_mounted_by_default() {
        let mut config = ProviderConfig::default();
        config.passthrough.enabled = false;
        let (server, _) = server(config);
        assert_eq!(
            get(server.router(), "/admin/status").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_invalid_cluster_endpoint() {
        let mut config = ProviderConfig::default();
        config.cluster.endpoint = "not a url".to_string();
        let settings = Arc::new(ArcSwap::from_pointee(config));
        assert!(HttpServer::new(settings, Arc::new(ProviderState::new())).is_err());
    }
}
