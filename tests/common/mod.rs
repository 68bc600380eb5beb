//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use service_guard::config::AdminConfig;
use service_guard::http::AdminServer;
use service_guard::lifecycle::Shutdown;
use service_guard::{BreakerConfig, BreakerRegistry};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Small thresholds so tests can trip breakers in a few calls.
pub fn test_config() -> BreakerConfig {
    BreakerConfig::default()
        .with_failure_threshold(2)
        .with_recovery_timeout(Duration::from_secs(60))
        .with_success_threshold(1)
        .with_call_timeout(Duration::from_secs(1))
}

/// Registry with one closed breaker per name.
pub fn registry_with(names: &[&str]) -> Arc<BreakerRegistry> {
    let registry = Arc::new(BreakerRegistry::new());
    for name in names {
        registry.get_or_create(name, test_config());
    }
    registry
}

/// Drive the named breaker to Open with consecutive failures.
pub async fn trip(registry: &BreakerRegistry, name: &str) {
    let breaker = registry.get_or_create(name, test_config());
    for _ in 0..breaker.config().failure_threshold {
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
    }
}

/// Admin router with the full middleware stack, for `oneshot` requests.
pub fn admin_router(registry: Arc<BreakerRegistry>, api_key: Option<&str>) -> Router {
    let config = AdminConfig {
        api_key: api_key.map(str::to_string),
        ..AdminConfig::default()
    };
    AdminServer::new(&config, registry).router()
}

/// Serve the admin API on an ephemeral port.
pub async fn spawn_admin(
    registry: Arc<BreakerRegistry>,
    shutdown: &Shutdown,
) -> (SocketAddr, JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = AdminServer::new(&AdminConfig::default(), registry);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, handle)
}
