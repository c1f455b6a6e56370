//! Run state for named recurring tasks.
//!
//! A task is `Idle` or `Running`. Starting a run flips the flag with a
//! compare-exchange, so a second start while the first is still running is
//! refused regardless of timer cadence. The returned guard flips it back.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot of one task's run history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStatus {
    pub name: String,
    pub running: bool,
    pub runs: u64,
    pub skipped_overlaps: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
}

#[derive(Debug, Default)]
struct History {
    runs: u64,
    skipped_overlaps: u64,
    last_started_at: Option<DateTime<Utc>>,
    last_finished_at: Option<DateTime<Utc>>,
    last_outcome: Option<String>,
}

/// Idle/running state of one named task.
#[derive(Debug)]
pub struct TaskState {
    name: &'static str,
    running: AtomicBool,
    history: Mutex<History>,
}

impl TaskState {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            running: AtomicBool::new(false),
            history: Mutex::new(History::default()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Moves `Idle → Running`. Returns `None` if a run is already in progress.
    pub fn try_start(self: &Arc<Self>, at: DateTime<Utc>) -> Option<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.history.lock().skipped_overlaps += 1;
            return None;
        }

        let mut history = self.history.lock();
        history.runs += 1;
        history.last_started_at = Some(at);

        Some(RunGuard {
            task: Arc::clone(self),
            outcome: None,
            finished_at: None,
        })
    }

    pub fn status(&self) -> TaskStatus {
        let history = self.history.lock();
        TaskStatus {
            name: self.name.to_string(),
            running: self.is_running(),
            runs: history.runs,
            skipped_overlaps: history.skipped_overlaps,
            last_started_at: history.last_started_at,
            last_finished_at: history.last_finished_at,
            last_outcome: history.last_outcome.clone(),
        }
    }
}

/// Held for the duration of a run; dropping it moves the task back to `Idle`.
#[derive(Debug)]
pub struct RunGuard {
    task: Arc<TaskState>,
    outcome: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

impl RunGuard {
    /// Records how the run ended.
    pub fn finish(mut self, at: DateTime<Utc>, outcome: impl Into<String>) {
        self.finished_at = Some(at);
        self.outcome = Some(outcome.into());
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        {
            let mut history = self.task.history.lock();
            history.last_finished_at = Some(self.finished_at.unwrap_or_else(Utc::now));
            history.last_outcome = Some(
                self.outcome
                    .take()
                    .unwrap_or_else(|| "aborted".to_string()),
            );
        }
        self.task.running.store(false, Ordering::Release);
    }
}
