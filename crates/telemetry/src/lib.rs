//! Internal telemetry for the backblast miner.
//!
//! Structured logging setup, in-process counters, and component health.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
