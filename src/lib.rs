//! Circuit-breaker resilience layer for unreliable dependencies.
//!
//! Callers guard CLI subprocesses, LLM backends and plugin calls through a
//! shared [`BreakerRegistry`]; dashboards read breaker status over the admin
//! API.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GuardConfig;
pub use http::AdminServer;
pub use lifecycle::Shutdown;
pub use resilience::{
    BreakerConfig, BreakerError, BreakerRegistry, BreakerStatus, CircuitBreaker, CircuitState,
    HealthStatus,
};
