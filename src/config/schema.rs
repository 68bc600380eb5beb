//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard
//! daemon. All types derive Serde traits for deserialization from TOML.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::{BreakerConfig, BreakerProfiles};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Admin/status HTTP API.
    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Settings for breakers without a named entry.
    pub defaults: BreakerSettings,

    /// Per-service breaker settings, keyed by service name.
    pub breakers: BTreeMap<String, BreakerSettings>,
}

impl GuardConfig {
    /// Breaker configuration applied to services without a named entry.
    pub fn default_breaker(&self) -> BreakerConfig {
        self.defaults.apply(BreakerConfig::default())
    }

    /// Build the registry profiles from this configuration.
    pub fn profiles(&self) -> BreakerProfiles {
        let default = self.default_breaker();
        self.breakers
            .iter()
            .fold(BreakerProfiles::new(default), |profiles, (name, settings)| {
                profiles.with_profile(name.clone(), settings.apply(default))
            })
    }
}

/// Tunables for one breaker. Unset fields come from the preset, or from
/// the enclosing defaults when no preset is named.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BreakerSettings {
    /// Named preset (`cli_subprocess`, `http_api`, `agent_gateway`,
    /// `local_llm`, `offline_fallback`, `default`).
    pub preset: Option<String>,

    #[serde(alias = "failureThreshold")]
    pub failure_threshold: Option<u32>,

    #[serde(alias = "recoveryTimeoutSeconds")]
    pub recovery_timeout_secs: Option<u64>,

    #[serde(alias = "successThreshold")]
    pub success_threshold: Option<u32>,

    #[serde(alias = "callTimeoutSeconds")]
    pub call_timeout_secs: Option<u64>,

    #[serde(alias = "monitoringWindowSeconds")]
    pub monitoring_window_secs: Option<u64>,
}

impl BreakerSettings {
    /// Overlay these settings on `base`.
    pub fn apply(&self, base: BreakerConfig) -> BreakerConfig {
        let mut config = self
            .preset
            .as_deref()
            .and_then(BreakerConfig::preset)
            .unwrap_or(base);

        if let Some(v) = self.failure_threshold {
            config = config.with_failure_threshold(v);
        }
        if let Some(v) = self.recovery_timeout_secs {
            config = config.with_recovery_timeout(Duration::from_secs(v));
        }
        if let Some(v) = self.success_threshold {
            config = config.with_success_threshold(v);
        }
        if let Some(v) = self.call_timeout_secs {
            config = config.with_call_timeout(Duration::from_secs(v));
        }
        if let Some(v) = self.monitoring_window_secs {
            config = config.with_monitoring_window(Duration::from_secs(v));
        }
        config
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Bearer token required on every admin request when set.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: None,
            request_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,

    /// How often breaker gauges are refreshed, in seconds.
    pub report_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            report_interval_secs: 15,
        }
    }
}
