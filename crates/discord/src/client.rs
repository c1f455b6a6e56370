//! Discord REST client wrapper.

use backblast_core::{ChannelId, Error, Result};
use moka::future::Cache;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::DiscordConfig;
use crate::models::RateLimited;

/// Upper bound on cached channel-existence answers.
const CHANNEL_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Longest 429 wait we are willing to sleep through.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

/// Discord REST client.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// channel-existence cache.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    config: DiscordConfig,
    /// Channel id -> exists
    channel_cache: Cache<ChannelId, bool>,
}

impl DiscordClient {
    /// Creates a new client. Fails on a missing token or a bad base URL.
    pub fn new(config: DiscordConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(Error::config("discord token is not set"));
        }
        let base = url::Url::parse(&config.api_base_url)
            .map_err(|e| Error::config(format!("invalid discord api_base_url: {}", e)))?;

        let mut auth = header::HeaderValue::from_str(&format!("Bot {}", config.token.trim()))
            .map_err(|_| Error::config("discord token contains invalid characters"))?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .user_agent(concat!("backblast-miner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        info!(api = %base, "Created Discord client");

        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            channel_cache: Cache::builder()
                .max_capacity(CHANNEL_CACHE_MAX_CAPACITY)
                .time_to_live(config.channel_cache_ttl())
                .build(),
            config,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }

    pub(crate) fn channel_cache(&self) -> &Cache<ChannelId, bool> {
        &self.channel_cache
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends a request, sleeping through 429s up to `max_retries` times.
    ///
    /// `build` is called once per attempt since a sent request is consumed.
    pub(crate) async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let response = build()
                .send()
                .await
                .map_err(|e| Error::platform(format!("discord request failed: {}", e)))?;

            let rate_limited = response.status() == StatusCode::TOO_MANY_REQUESTS;
            if !rate_limited || attempt >= self.config.max_retries {
                return Ok(response);
            }

            attempt += 1;
            let wait = match response.json::<RateLimited>().await {
                Ok(body) if body.retry_after.is_finite() => Duration::from_secs_f64(
                    body.retry_after.clamp(0.0, MAX_RATE_LIMIT_WAIT.as_secs_f64()),
                ),
                _ => Duration::from_secs(1),
            };
            warn!(
                attempt = attempt,
                wait_ms = %wait.as_millis(),
                "Discord rate limited, backing off"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// GETs `path` and decodes a JSON body, treating non-2xx as an error.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .execute(|| self.request(Method::GET, path).query(query))
            .await?;
        let response = error_for_status(path, response).await?;
        debug!(path = path, "Discord GET ok");
        response
            .json()
            .await
            .map_err(|e| Error::platform(format!("invalid discord response for {}: {}", path, e)))
    }
}

/// Maps a non-success response to a platform error carrying its body.
pub(crate) async fn error_for_status(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::platform(format!(
        "discord {} returned {}: {}",
        path,
        status,
        body.chars().take(200).collect::<String>()
    )))
}
