//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller guarding a dependency:
//!     → registry.rs (look up or create the named breaker)
//!     → circuit_breaker.rs (admit or reject; run work)
//!     → timeouts.rs (enforce the call deadline)
//!     → metrics.rs (counters, rolling window)
//!     → classified result back to the caller
//!
//! Dashboards:
//!     → registry.rs get_all_status()
//!     → status.rs snapshots (serialized by the admin API)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; a missed deadline is a failure
//! - The breaker never retries; callers decide on retry or fallback
//! - The breaker never swallows the work's own error
//! - State is process-local; nothing is persisted

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod status;
pub mod timeouts;

pub use circuit_breaker::CircuitBreaker;
pub use config::BreakerConfig;
pub use error::{BreakerError, RegistryError};
pub use registry::{BreakerProfiles, BreakerRegistry};
pub use status::{BreakerStatus, CircuitState, HealthStatus, RegistryStatus, StatusSummary};
