//! Admin/status API for dashboards and operators.
//!
//! Reads never mutate breaker state; only the reset and force endpoints do.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/circuit-breakers/status", get(get_all_status))
        .route("/circuit-breakers/reset-all", post(reset_all))
        .route("/circuit-breakers/{name}", get(get_breaker))
        .route("/circuit-breakers/{name}/reset", post(reset_breaker))
        .route("/circuit-breakers/{name}/force-open", post(force_open))
        .route("/circuit-breakers/{name}/force-half-open", post(force_half_open))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
