//! HTTP surface tests against a running server.

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use traefik_fabric::{HttpServer, Poller, ProviderConfig, ProviderState, Shutdown};

mod common;

use common::{address, closed_port, start_echo_backend, FakeCluster};

struct Running {
    addr: SocketAddr,
    state: Arc<ProviderState>,
    settings: Arc<ArcSwap<ProviderConfig>>,
    shutdown: Shutdown,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn start(config: ProviderConfig) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let settings = Arc::new(ArcSwap::from_pointee(config));
    let state = Arc::new(ProviderState::new());
    let shutdown = Shutdown::new();

    let server = HttpServer::new(settings.clone(), state.clone()).unwrap();
    tokio::spawn(server.run(listener, shutdown.clone()));

    Running {
        addr,
        state,
        settings,
        shutdown,
    }
}

fn cluster_at(addr: SocketAddr) -> ProviderConfig {
    let mut config = ProviderConfig::default();
    config.cluster.endpoint = format!("http://{}/", addr);
    config
}

#[tokio::test]
async fn test_passthrough_forwards_get() {
    let backend = start_echo_backend(200).await;
    let server = start(cluster_at(backend)).await;

    let res = reqwest::Client::new()
        .get(server.url("/Applications?api-version=6.0"))
        .header("x-custom", "1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-upstream").unwrap(), "fabric");
    let body = res.text().await.unwrap();
    assert!(body.starts_with("GET /Applications?api-version=6.0 HTTP/1.1"));
    assert!(body.contains("x-custom: 1"));
    assert!(body.contains(&format!("host: {}", backend)));
    assert!(!body.contains(&format!("host: {}", server.addr)));
}

#[tokio::test]
async fn test_passthrough_copies_upstream_status() {
    let backend = start_echo_backend(404).await;
    let server = start(cluster_at(backend)).await;

    let res = reqwest::get(server.url("/Nodes")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_passthrough_relays_end_to_end_headers() {
    let backend = start_echo_backend(200).await;
    let server = start(cluster_at(backend)).await;

    let res = reqwest::get(server.url("/Nodes")).await.unwrap();
    assert_eq!(res.headers().get("content-type").unwrap(), "text/plain");
    assert_eq!(res.headers().get("x-upstream").unwrap(), "fabric");
    assert!(res.headers().get("connection").is_none());
    assert!(res.text().await.unwrap().starts_with("GET /Nodes HTTP/1.1"));
}

#[tokio::test]
async fn test_passthrough_rejects_non_get() {
    let backend = start_echo_backend(200).await;
    let server = start(cluster_at(backend)).await;

    let res = reqwest::Client::new()
        .post(server.url("/Applications"))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_passthrough_upstream_down() {
    let server = start(cluster_at(closed_port().await)).await;

    let res = reqwest::get(server.url("/Applications")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_passthrough_toggle_is_hot() {
    let backend = start_echo_backend(200).await;
    let server = start(cluster_at(backend)).await;

    let mut config = cluster_at(backend);
    config.passthrough.enabled = false;
    server.settings.store(Arc::new(config));

    let res = reqwest::get(server.url("/Applications")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_generated_and_preserved() {
    let server = start(ProviderConfig::default()).await;

    let res = reqwest::get(server.url("/healthz")).await.unwrap();
    let generated = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let res = reqwest::Client::new()
        .get(server.url("/healthz"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "trace-42");
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_config_endpoints_follow_poller() {
    let server = start(ProviderConfig::default()).await;
    assert_eq!(
        reqwest::get(server.url("/config")).await.unwrap().status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let cluster = Arc::new(
        FakeCluster::new()
            .application("fabric:/Shop", "ShopType")
            .stateless(
                "fabric:/Shop",
                "fabric:/Shop/Api",
                "ApiType",
                &[address(&[("Web", "http://10.0.0.1:8080")])],
            )
            .property("fabric:/Shop/Api", "traefik.enable", "true"),
    );
    let poller = Poller::new(cluster, server.settings.clone(), server.state.clone());
    poller.poll_once(CancellationToken::new()).await.unwrap();

    let res = reqwest::get(server.url("/config")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "application/yaml");
    let yaml = res.text().await.unwrap();
    assert!(yaml.contains("Shop-Api_default"));
    assert!(yaml.contains("- url: http://10.0.0.1:8080"));

    let json: Value = reqwest::get(server.url("/config.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        json["http"]["routers"]["Shop-Api_default"]["service"],
        "Shop-Api_default"
    );
    assert_eq!(
        json["http"]["services"]["Shop-Api_default"]["loadBalancer"]["servers"][0]["url"],
        "http://10.0.0.1:8080"
    );
}

#[tokio::test]
async fn test_admin_status_requires_key() {
    let mut config = ProviderConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = "secret".to_string();
    let server = start(config).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/admin/status"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/admin/status"))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["ready"], false);
    assert_eq!(status["polls"], 0);
    assert_eq!(status["cluster"], "http://localhost:19080/");
}

#[tokio::test]
async fn test_admin_key_reload() {
    let mut config = ProviderConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = "old".to_string();
    let server = start(config.clone()).await;

    config.admin.api_key = "new".to_string();
    server.settings.store(Arc::new(config));

    let client = reqwest::Client::new();
    let old = client
        .get(server.url("/admin/status"))
        .bearer_auth("old")
        .send()
        .await
        .unwrap();
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = client
        .get(server.url("/admin/status"))
        .bearer_auth("new")
        .send()
        .await
        .unwrap();
    assert_eq!(new.status(), StatusCode::OK);
}
