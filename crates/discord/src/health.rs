//! Discord session health checks.

use reqwest::Method;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::client::DiscordClient;

/// Check that the token is accepted and the API is reachable.
pub async fn check_connection(client: &DiscordClient) -> bool {
    let result = client
        .execute(|| client.request(Method::GET, "/users/@me"))
        .await;
    match result {
        Ok(response) if response.status().is_success() => {
            debug!("Discord connection healthy");
            true
        }
        Ok(response) => {
            error!(status = %response.status(), "Discord health check rejected");
            false
        }
        Err(e) => {
            error!("Discord health check failed: {}", e);
            false
        }
    }
}

/// Polls [`check_connection`] until it succeeds.
///
/// Scheduled tasks do not start until this returns.
pub async fn wait_until_ready(client: &DiscordClient, retry_every: Duration) {
    loop {
        if check_connection(client).await {
            telemetry::health().discord.set_healthy();
            return;
        }
        telemetry::health()
            .discord
            .set_unhealthy("Discord API unreachable or token rejected");
        warn!(retry_secs = retry_every.as_secs(), "Discord not ready, retrying");
        tokio::time::sleep(retry_every).await;
    }
}
