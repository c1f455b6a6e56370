//! Scheduled work for the backblast miner.
//!
//! - Checkpoint tracking (per-channel scan progress, persisted)
//! - Channel mining (history fetch → parse → upsert → reply)
//! - Ingestion scheduler (hourly fan-out, daily directory sync, report gate)
//! - Directory sync and monthly reporting

pub mod checkpoint;
pub mod clock;
pub mod directory;
pub mod miner;
pub mod reporting;
pub mod scheduler;
pub mod task;

pub use checkpoint::CheckpointTracker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{DirectorySync, SyncSummary};
pub use miner::{ChannelMiner, ScanOutcome};
pub use reporting::{month_name, report_month, MonthlyReporter};
pub use scheduler::*;
pub use task::{RunGuard, TaskState, TaskStatus};
