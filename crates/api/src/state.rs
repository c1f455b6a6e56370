//! Application state shared across handlers.

use std::sync::Arc;
use worker::{IngestionScheduler, TaskStatus};

/// Anything that can report the state of the scheduled tasks.
pub trait TaskStatusSource: Send + Sync {
    fn task_statuses(&self) -> Vec<TaskStatus>;
}

impl TaskStatusSource for IngestionScheduler {
    fn task_statuses(&self) -> Vec<TaskStatus> {
        IngestionScheduler::task_statuses(self)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Scheduler in production, a stub in tests
    pub tasks: Arc<dyn TaskStatusSource>,
}

impl AppState {
    pub fn new(tasks: Arc<dyn TaskStatusSource>) -> Self {
        Self { tasks }
    }
}
