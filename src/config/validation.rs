//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and durations > 0, addresses parse)
//! - Reject unknown presets and service names unusable in URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerSettings, GuardConfig};
use crate::resilience::BreakerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "admin.bind_address",
            format!("invalid socket address '{}'", config.admin.bind_address),
        ));
    }
    if config.admin.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
        errors.push(ValidationError::new("admin.api_key", "must not be empty when set"));
    }
    if config.admin.request_timeout_secs == 0 {
        errors.push(ValidationError::new("admin.request_timeout_secs", "must be at least 1"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }
    if obs.report_interval_secs == 0 {
        errors.push(ValidationError::new(
            "observability.report_interval_secs",
            "must be at least 1",
        ));
    }

    validate_settings("defaults", &config.defaults, &mut errors);
    for (name, settings) in &config.breakers {
        if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
            errors.push(ValidationError::new(
                format!("breakers.{name}"),
                "service name must be non-empty without '/' or whitespace",
            ));
        }
        validate_settings(&format!("breakers.{name}"), settings, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_settings(prefix: &str, settings: &BreakerSettings, errors: &mut Vec<ValidationError>) {
    if let Some(preset) = settings.preset.as_deref() {
        if BreakerConfig::preset(preset).is_none() {
            errors.push(ValidationError::new(
                format!("{prefix}.preset"),
                format!("unknown preset '{preset}'"),
            ));
        }
    }

    let positive = [
        ("failure_threshold", settings.failure_threshold.map(u64::from)),
        ("success_threshold", settings.success_threshold.map(u64::from)),
        ("recovery_timeout_secs", settings.recovery_timeout_secs),
        ("call_timeout_secs", settings.call_timeout_secs),
        ("monitoring_window_secs", settings.monitoring_window_secs),
    ];
    for (field, value) in positive {
        if value == Some(0) {
            errors.push(ValidationError::new(format!("{prefix}.{field}"), "must be at least 1"));
        }
    }
}
