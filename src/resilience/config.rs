//! Per-breaker tunables.
//!
//! A `BreakerConfig` is fixed when its breaker is created. Callers pick a
//! preset matching the kind of dependency they guard and adjust it with the
//! `with_*` setters.

use std::time::Duration;

use serde::Serialize;

/// Immutable parameters for one circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit from Closed.
    pub failure_threshold: u32,
    /// Time the circuit stays Open before a trial call is let through.
    #[serde(rename = "recoveryTimeoutSeconds", serialize_with = "as_secs")]
    pub recovery_timeout: Duration,
    /// Consecutive Half-Open successes that close the circuit.
    pub success_threshold: u32,
    /// Deadline for a single guarded call.
    #[serde(rename = "callTimeoutSeconds", serialize_with = "as_secs")]
    pub call_timeout: Duration,
    /// Span of the rolling window used for health classification.
    #[serde(rename = "monitoringWindowSeconds", serialize_with = "as_secs")]
    pub monitoring_window: Duration,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            call_timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(300),
        }
    }
}

impl BreakerConfig {
    /// Profile for CLI subprocess invocations (slow, expensive to start).
    pub fn cli_subprocess() -> Self {
        Self::from_parts(3, 60, 2, 90, 300)
    }

    /// Profile for remote HTTP APIs.
    pub fn http_api() -> Self {
        Self::from_parts(5, 45, 3, 60, 300)
    }

    /// Profile for external agent gateways.
    pub fn agent_gateway() -> Self {
        Self::from_parts(3, 30, 2, 45, 180)
    }

    /// Profile for locally hosted model servers.
    pub fn local_llm() -> Self {
        Self::from_parts(3, 30, 2, 45, 300)
    }

    /// Profile for offline fallbacks that should recover quickly.
    pub fn offline_fallback() -> Self {
        Self::from_parts(2, 15, 1, 30, 180)
    }

    /// Look up a preset by its configuration name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "cli_subprocess" => Some(Self::cli_subprocess()),
            "http_api" => Some(Self::http_api()),
            "agent_gateway" => Some(Self::agent_gateway()),
            "local_llm" => Some(Self::local_llm()),
            "offline_fallback" => Some(Self::offline_fallback()),
            _ => None,
        }
    }

    fn from_parts(failures: u32, recovery: u64, successes: u32, call: u64, window: u64) -> Self {
        Self {
            failure_threshold: failures,
            recovery_timeout: Duration::from_secs(recovery),
            success_threshold: successes,
            call_timeout: Duration::from_secs(call),
            monitoring_window: Duration::from_secs(window),
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_monitoring_window(mut self, window: Duration) -> Self {
        self.monitoring_window = window;
        self
    }

    /// Clamp thresholds so a breaker can always make progress.
    pub(crate) fn normalized(mut self) -> Self {
        self.failure_threshold = self.failure_threshold.max(1);
        self.success_threshold = self.success_threshold.max(1);
        self
    }
}
