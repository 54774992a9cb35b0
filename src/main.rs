//! Service Fabric provider for Traefik.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        TRAEFIK-FABRIC                            │
//!   │                                                                  │
//!   │  ┌─────────┐   ┌───────────┐   ┌──────────┐   ┌──────────────┐   │
//!   │  │ poller  │──▶│ discovery │──▶│ dynamic  │──▶│   emitter    │───┼──▶ dynamic.yaml
//!   │  │interval │   │ walk/label│   │ builder  │   │ yaml / json  │   │
//!   │  └─────────┘   │ endpoints │   └──────────┘   └──────┬───────┘   │
//!   │                └─────┬─────┘                         │           │
//!   │                      │                               ▼           │
//!   │                      ▼                        ┌──────────────┐   │
//!   │               ┌────────────┐                  │ProviderState │   │
//!   │  Cluster ◀────│  cluster   │                  └──────┬───────┘   │
//!   │  gateway      │  REST      │                         │           │
//!   │     ▲         └────────────┘                  ┌──────▼───────┐   │
//!   │     └─────────── GET passthrough ─────────────│ http server  │◀──┼─── Traefik / operators
//!   │                                               └──────────────┘   │
//!   │                                                                  │
//!   │  Cross-cutting: config (TOML + hot reload), observability,       │
//!   │                 lifecycle (signals, shutdown)                    │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use traefik_fabric::config::{load_config, watcher};
use traefik_fabric::lifecycle::spawn_signal_handler;
use traefik_fabric::observability::{init_logging, init_metrics};
use traefik_fabric::{
    HttpServer, Poller, ProviderConfig, ProviderState, RestClusterClient, Shutdown,
};

#[derive(Parser)]
#[command(name = "traefik-fabric")]
#[command(about = "Traefik dynamic configuration from Service Fabric labels", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProviderConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!("traefik-fabric v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cluster = %config.cluster.endpoint,
        interval_secs = config.poll.interval_secs,
        output_path = ?config.poll.output_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = Arc::new(RestClusterClient::new(&config.cluster)?);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let settings = Arc::new(ArcSwap::from_pointee(config));
    let state = Arc::new(ProviderState::new());
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match &args.config {
        Some(path) => {
            let (config_watcher, updates) = watcher::ConfigWatcher::new(path);
            tokio::spawn(watcher::apply_updates(settings.clone(), updates));
            match config_watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let signals = spawn_signal_handler(shutdown.clone());

    let poller = Poller::new(client, settings.clone(), state.clone());
    let poller_task = tokio::spawn(poller.run(shutdown.clone()));

    let server = HttpServer::new(settings, state)?;
    let served = server.run(listener, shutdown.clone()).await;

    shutdown.trigger();
    let _ = poller_task.await;
    signals.abort();

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
