//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, admin API, lifecycle:
//!     → logging.rs (structured log events)
//!
//! Breaker snapshots (polled):
//!     → metrics.rs StatusReporter
//!     → gauges/counters
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through admin API logs
//! - Guarded calls never log; observers read snapshots instead

pub mod logging;
pub mod metrics;
