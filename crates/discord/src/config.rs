//! Discord client configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Discord REST client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token (without the `Bot ` prefix)
    #[serde(default)]
    pub token: String,
    /// REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Budget for the AO channel lookup made while parsing, in milliseconds
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// How long channel-existence answers are cached, in seconds
    #[serde(default = "default_channel_cache_ttl_secs")]
    pub channel_cache_ttl_secs: u64,
    /// Retries after a 429 before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_lookup_timeout_ms() -> u64 {
    backblast_core::limits::DEFAULT_LOOKUP_TIMEOUT_MS
}

fn default_channel_cache_ttl_secs() -> u64 {
    3600
}

fn default_max_retries() -> u32 {
    3
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            channel_cache_ttl_secs: default_channel_cache_ttl_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl DiscordConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn channel_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.channel_cache_ttl_secs)
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("lookup_timeout_ms", &self.lookup_timeout_ms)
            .field("channel_cache_ttl_secs", &self.channel_cache_ttl_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
