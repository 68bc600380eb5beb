//! Service guard daemon.
//!
//! Hosts the process-wide circuit breaker registry and serves its status
//! and operator controls over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!   callers ──▶ BreakerRegistry ──▶ CircuitBreaker ──▶ dependency
//!                    │                                (CLI, LLM, plugin)
//!                    │ snapshots
//!        ┌───────────┴───────────┐
//!        ▼                       ▼
//!   admin API (axum)      StatusReporter ──▶ Prometheus
//!   dashboards/operators
//! ```
//!
//! Usage: `service-guard [CONFIG.toml]` (or `SERVICE_GUARD_CONFIG`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use service_guard::config::{load_config, watcher::ConfigWatcher, GuardConfig};
use service_guard::lifecycle::{signals::spawn_signal_listener, Shutdown};
use service_guard::observability::{logging::init_logging, metrics};
use service_guard::{AdminServer, BreakerRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path: Option<PathBuf> = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("SERVICE_GUARD_CONFIG"))
        .map(PathBuf::from);

    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "service-guard starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(BreakerRegistry::with_profiles(config.profiles()));
    let preloaded = registry.preload();
    tracing::info!(breakers = preloaded, "Circuit breakers registered");

    let shutdown = Arc::new(Shutdown::new());
    let serve_shutdown = shutdown.subscribe();
    spawn_signal_listener(shutdown.clone());

    let reporter = metrics::StatusReporter::new(
        registry.clone(),
        Duration::from_secs(config.observability.report_interval_secs),
    );
    tokio::spawn(reporter.run(shutdown.subscribe()));

    // Keep the watcher handle alive for the life of the process.
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let registry = registry.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    registry.update_profiles(new_config.profiles());
                    registry.preload();
                }
            });
            match watcher.with_current(&config).run() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let server = AdminServer::new(&config.admin, registry.clone());
        server.run(listener, serve_shutdown).await?;
    } else {
        tracing::info!("Admin API disabled");
        let mut serve_shutdown = serve_shutdown;
        serve_shutdown.recv().await.ok();
    }

    if !shutdown.is_triggered() {
        tracing::warn!("Admin API stopped without a shutdown signal");
        shutdown.trigger();
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
