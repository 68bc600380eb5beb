//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `guard_breaker_requests` (gauge): lifetime calls by outcome
//! - `guard_breaker_rejected` (gauge): calls refused by an open circuit
//! - `guard_breaker_success_rate` (gauge): lifetime success ratio
//! - `guard_breaker_avg_response_ms` (gauge): mean call latency
//! - `guard_breakers_open` / `guard_breakers_total` (gauge): registry summary
//! - `guard_admin_actions_total` (counter): operator actions by kind
//!
//! # Design Decisions
//! - Breakers never touch the recorder; a reporter task polls snapshots
//! - Per-breaker values are gauges because a manual reset zeroes them
//! - State changes between polls are logged by the reporter

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tokio::sync::broadcast;
use tokio::time;

use crate::resilience::{BreakerRegistry, CircuitState, RegistryStatus};

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Count one operator action from the admin API.
pub fn record_admin_action(action: &'static str) {
    counter!("guard_admin_actions_total", "action" => action).increment(1);
}

/// Push a registry snapshot into the recorder.
pub fn publish_status(status: &RegistryStatus) {
    for (name, breaker) in &status.circuit_breakers {
        let m = &breaker.metrics;
        gauge!("guard_breaker_state", "service" => name.clone()).set(breaker.state.as_gauge());
        gauge!("guard_breaker_requests", "service" => name.clone(), "outcome" => "success")
            .set(m.successful_requests as f64);
        gauge!("guard_breaker_requests", "service" => name.clone(), "outcome" => "failure")
            .set(m.failed_requests as f64);
        gauge!("guard_breaker_requests", "service" => name.clone(), "outcome" => "timeout")
            .set(m.timeouts as f64);
        gauge!("guard_breaker_rejected", "service" => name.clone()).set(m.rejected_requests as f64);
        gauge!("guard_breaker_success_rate", "service" => name.clone()).set(m.success_rate);
        gauge!("guard_breaker_avg_response_ms", "service" => name.clone())
            .set(m.average_response_time_ms);
    }
    gauge!("guard_breakers_open").set(status.summary.open_circuits as f64);
    gauge!("guard_breakers_total").set(status.summary.total_services as f64);
}

/// Periodically snapshots the registry into metrics and logs state changes.
pub struct StatusReporter {
    registry: Arc<BreakerRegistry>,
    interval: Duration,
    last_states: HashMap<String, CircuitState>,
}

impl StatusReporter {
    pub fn new(registry: Arc<BreakerRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            last_states: HashMap::new(),
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Status reporter starting");
        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = self.registry.get_all_status();
                    for (service, from, to) in self.observe(&status) {
                        if to == CircuitState::Open {
                            tracing::warn!(service = %service, from = %from, to = %to, "Circuit breaker state changed");
                        } else {
                            tracing::info!(service = %service, from = %from, to = %to, "Circuit breaker state changed");
                        }
                    }
                    publish_status(&status);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Status reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Record current states; return `(service, from, to)` for every change since the last call.
    pub fn observe(&mut self, status: &RegistryStatus) -> Vec<(String, CircuitState, CircuitState)> {
        let mut changes = Vec::new();
        for (name, breaker) in &status.circuit_breakers {
            let previous = self.last_states.insert(name.clone(), breaker.state);
            if let Some(from) = previous {
                if from != breaker.state {
                    changes.push((name.clone(), from, breaker.state));
                }
            }
        }
        changes
    }
}
