use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::server::AppState;
use crate::observability::metrics::record_admin_action;
use crate::resilience::{BreakerStatus, CircuitState, HealthStatus, RegistryError, RegistryStatus};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breakers: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub status: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetAllResponse {
    pub status: &'static str,
    pub reset: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub status: &'static str,
    pub name: String,
    pub state: CircuitState,
    pub health_status: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl StateResponse {
    fn from_status(status: BreakerStatus) -> Self {
        Self {
            status: "success",
            name: status.name,
            state: status.state,
            health_status: status.health_status,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ForceOpenRequest {
    pub reason: Option<String>,
}

/// Errors returned by admin endpoints.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid request body: {0}")]
    BadRequest(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({
            "status": "error",
            "error": self.to_string(),
            "timestamp": Utc::now(),
        });
        (status, Json(body)).into_response()
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        breakers: state.registry.len(),
    })
}

pub async fn get_all_status(State(state): State<AppState>) -> Json<RegistryStatus> {
    Json(state.registry.get_all_status())
}

pub async fn get_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerStatus>, AdminError> {
    let breaker = state
        .registry
        .get_breaker(&name)
        .ok_or(RegistryError::NotFound(name))?;
    Ok(Json(breaker.status()))
}

pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, AdminError> {
    state.registry.reset(&name)?;
    record_admin_action("reset");
    Ok(Json(ActionResponse {
        status: "success",
        message: format!("Circuit breaker {name} reset successfully"),
        timestamp: Utc::now(),
    }))
}

pub async fn reset_all(State(state): State<AppState>) -> Json<ResetAllResponse> {
    let reset = state.registry.reset_all();
    record_admin_action("reset_all");
    Json(ResetAllResponse {
        status: "success",
        reset,
        timestamp: Utc::now(),
    })
}

pub async fn force_open(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<StateResponse>, AdminError> {
    let request: ForceOpenRequest = if body.is_empty() {
        ForceOpenRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AdminError::BadRequest(e.to_string()))?
    };
    let reason = request.reason.as_deref().unwrap_or("operator request");

    let status = state.registry.force_open(&name, reason)?;
    record_admin_action("force_open");
    Ok(Json(StateResponse::from_status(status)))
}

pub async fn force_half_open(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StateResponse>, AdminError> {
    let status = state.registry.force_half_open(&name)?;
    record_admin_action("force_half_open");
    Ok(Json(StateResponse::from_status(status)))
}
