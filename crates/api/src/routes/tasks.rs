//! Scheduled task status.

use axum::{extract::State, Json};

use crate::response::TasksResponse;
use crate::state::AppState;

/// GET /tasks - Run state of every scheduled task.
pub async fn tasks_handler(State(state): State<AppState>) -> Json<TasksResponse> {
    Json(TasksResponse::new(state.tasks.task_statuses()))
}
