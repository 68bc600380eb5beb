//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Logging → Metrics → Registry (+ named breakers)
//!     → Status reporter → Config watcher → Admin listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → reporter exits, admin server drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
