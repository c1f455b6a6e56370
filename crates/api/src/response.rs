//! Response bodies.

use serde::{Deserialize, Serialize};
use telemetry::ComponentHealthReport;
use worker::TaskStatus;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub discord_connected: bool,
    pub clickhouse_connected: bool,
    pub channels_in_flight: u64,
    pub components: Vec<ComponentHealthReport>,
}

/// Task status response.
#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskStatus>,
    pub timestamp: i64,
}

impl TasksResponse {
    pub fn new(tasks: Vec<TaskStatus>) -> Self {
        Self {
            tasks,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
