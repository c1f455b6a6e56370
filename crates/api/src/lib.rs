//! Operational HTTP endpoints: health probes, metrics, task status.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{AppState, TaskStatusSource};
