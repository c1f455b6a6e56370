//! Backblast Miner
//!
//! Periodically scans monitored Discord channels for workout backblasts:
//! - Parses each candidate post into an attendance record
//! - Upserts records into per-region ClickHouse databases
//! - Replies to malformed posts with what needs fixing
//! - Syncs the guild directory daily and posts a monthly AO summary

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use api::{router, AppState};
use backblast_core::{validate_regions, BackblastParser, ParserConfig, RegionConfig};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use discord_client::{DiscordClient, DiscordConfig};
use telemetry::init_tracing_from_env;
use worker::{
    ChannelMiner, CheckpointTracker, DirectorySync, IngestionScheduler, MonthlyReporter,
    SchedulerConfig,
};

/// How often readiness is re-checked before the first scheduled run.
const READINESS_RETRY: Duration = Duration::from_secs(30);

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    discord: DiscordConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    scheduler: SchedulerConfig,

    #[serde(default)]
    parser: ParserSettings,

    #[serde(default)]
    regions: Vec<RegionConfig>,
}

/// Parser overrides.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ParserSettings {
    /// Replaces the built-in "no FNGs" sentinels when set
    #[serde(default)]
    fng_zero_sentinels: Option<Vec<String>>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            discord: DiscordConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            scheduler: SchedulerConfig::default(),
            parser: ParserSettings::default(),
            regions: Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Backblast Miner v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config()?;

    validate_regions(&config.regions).context("Invalid region configuration")?;
    config
        .scheduler
        .check()
        .context("Invalid scheduler configuration")?;
    if config.regions.is_empty() {
        warn!("No regions configured, scheduled tasks will have nothing to do");
    }
    info!(
        regions = config.regions.len(),
        channels = config.regions.iter().map(|r| r.monitored_channels.len()).sum::<usize>(),
        "Loaded region config"
    );

    // Every concurrent channel worker must be able to hold a checkout.
    config.clickhouse.pool_size = config
        .clickhouse
        .pool_size
        .max(config.scheduler.max_concurrent_channels);

    let clickhouse = ClickHouseClient::new(config.clickhouse.clone())
        .context("Failed to create ClickHouse client")?;

    clickhouse_client::health::init_schema(
        &clickhouse,
        config.regions.iter().map(|r| r.namespace.as_str()),
    )
    .await
    .context("Failed to initialize ClickHouse schema")?;
    clickhouse_client::health::check_connection(&clickhouse).await;

    let store = Arc::new(ClickHouseStore::new(clickhouse.clone()));

    let discord = Arc::new(
        DiscordClient::new(config.discord.clone()).context("Failed to create Discord client")?,
    );

    let mut parser_config = ParserConfig {
        lookup_timeout: config.discord.lookup_timeout(),
        ..ParserConfig::default()
    };
    if let Some(sentinels) = config.parser.fng_zero_sentinels.clone() {
        parser_config.fng_zero_sentinels = sentinels;
    }
    let parser = Arc::new(BackblastParser::new(parser_config));

    let tracker = Arc::new(CheckpointTracker::new(store.clone()));
    tracker
        .load()
        .await
        .context("Failed to load channel checkpoints")?;

    let miner = Arc::new(ChannelMiner::from_platform(
        discord.clone(),
        store.clone(),
        parser,
        config.scheduler.page_size,
    ));
    let directory = Arc::new(DirectorySync::new(discord.clone(), store.clone()));
    let reporter = Arc::new(MonthlyReporter::new(
        store.clone(),
        discord.clone(),
        config.scheduler.report_hour_utc,
    ));

    let scheduler = Arc::new(IngestionScheduler::new(
        config.scheduler.clone(),
        config.regions.clone(),
        miner,
        tracker,
        directory,
        reporter,
    ));

    // Tasks start once Discord accepts the token and ClickHouse answers.
    let (ready_tx, ready_rx) = watch::channel(false);
    let _readiness = {
        let discord = discord.clone();
        let clickhouse = clickhouse.clone();
        tokio::spawn(async move {
            discord_client::health::wait_until_ready(&discord, READINESS_RETRY).await;
            while !clickhouse_client::health::check_connection(&clickhouse).await {
                warn!(retry_secs = READINESS_RETRY.as_secs(), "ClickHouse not ready, retrying");
                tokio::time::sleep(READINESS_RETRY).await;
            }
            info!("Discord and ClickHouse ready");
            let _ = ready_tx.send(true);
        })
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task_handles = scheduler.clone().start(ready_rx, shutdown_rx);

    let app = router(AppState::new(scheduler.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!(
        grace_secs = config.scheduler.shutdown_grace_secs,
        "Shutting down, waiting for in-flight runs..."
    );
    let _ = shutdown_tx.send(true);
    for handle in task_handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Task loop ended abnormally");
        }
    }
    for status in scheduler.task_statuses() {
        if status.running {
            error!(task = %status.name, "Task still running at shutdown");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("BACKBLAST")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Secrets are set directly; nested parsing of underscored names is unreliable.
    if let Ok(token) = std::env::var("BACKBLAST_DISCORD_TOKEN") {
        config.discord.token = token;
    }
    if let Ok(url) = std::env::var("BACKBLAST_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(username) = std::env::var("BACKBLAST_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("BACKBLAST_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
