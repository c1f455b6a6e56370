//! ClickHouse configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    pub url: String,
    /// Database holding process-wide state (channel checkpoints)
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Maximum concurrent checkouts
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Query timeout in seconds (also bounds waiting for a checkout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_database() -> String {
    "backblast".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: default_database(),
            username: None,
            password: None,
            pool_size: default_pool_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClickHouseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
