//! Admin HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router for the admin API
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve on a listener until shutdown is broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::AdminConfig;
use crate::http::request::{make_span, UuidRequestId, X_REQUEST_ID};
use crate::resilience::BreakerRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BreakerRegistry>,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(registry: Arc<BreakerRegistry>, api_key: Option<String>) -> Self {
        Self {
            registry,
            api_key: api_key.map(Arc::from),
        }
    }
}

/// HTTP server for the admin/status API.
pub struct AdminServer {
    router: Router,
}

impl AdminServer {
    pub fn new(config: &AdminConfig, registry: Arc<BreakerRegistry>) -> Self {
        let state = AppState::new(registry, config.api_key.clone());
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AdminConfig, state: AppState) -> Router {
        setup_admin_router(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Admin API listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Admin API stopped");
        Ok(())
    }
}
