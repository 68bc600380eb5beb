//! Read-only snapshots served to dashboards.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::resilience::config::BreakerConfig;

/// Success rate at or above which a closed circuit counts as healthy.
pub const HEALTHY_SUCCESS_RATE: f64 = 0.8;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Numeric encoding for gauges.
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-value health summary derived from state and recent success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Recovering,
    Unhealthy,
}

impl HealthStatus {
    pub fn classify(state: CircuitState, success_rate: f64) -> Self {
        match state {
            CircuitState::Open => HealthStatus::Unhealthy,
            CircuitState::HalfOpen => HealthStatus::Recovering,
            CircuitState::Closed if success_rate >= HEALTHY_SUCCESS_RATE => HealthStatus::Healthy,
            CircuitState::Closed => HealthStatus::Degraded,
        }
    }
}

/// One recorded state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub timestamp: DateTime<Utc>,
    pub from: CircuitState,
    pub to: CircuitState,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rejected_requests: u64,
    pub timeouts: u64,
    pub circuit_open_count: u64,
    pub success_rate: f64,
    pub window_success_rate: Option<f64>,
    pub average_response_time_ms: f64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub trial_in_flight: bool,
    pub config: BreakerConfig,
    pub metrics: MetricsSnapshot,
    pub health_status: HealthStatus,
    pub recent_transitions: Vec<StateChange>,
}

/// Dashboard summary across all breakers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total_services: usize,
    pub healthy_services: usize,
    pub degraded_services: usize,
    pub recovering_services: usize,
    pub open_circuits: usize,
}

impl StatusSummary {
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a BreakerStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.total_services += 1;
            match status.health_status {
                HealthStatus::Healthy => summary.healthy_services += 1,
                HealthStatus::Degraded => summary.degraded_services += 1,
                HealthStatus::Recovering => summary.recovering_services += 1,
                HealthStatus::Unhealthy => {}
            }
            if status.state == CircuitState::Open {
                summary.open_circuits += 1;
            }
        }
        summary
    }
}

/// Snapshot of every registered breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    pub circuit_breakers: BTreeMap<String, BreakerStatus>,
    pub summary: StatusSummary,
    pub timestamp: DateTime<Utc>,
}
