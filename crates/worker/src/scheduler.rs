//! Ingestion scheduler.
//!
//! Owns three named recurring tasks (ingestion, directory sync, report
//! check), each with its own run-state guard. Ticks spawn runs rather than
//! awaiting them, so a slow run is skipped over by the guard instead of
//! delaying the timer.

use backblast_core::{ChannelCheckpoint, ChannelId, Error, RegionConfig, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::checkpoint::CheckpointTracker;
use crate::clock::{Clock, SystemClock};
use crate::directory::{DirectorySync, SyncSummary};
use crate::miner::{ChannelMiner, ScanOutcome};
use crate::reporting::MonthlyReporter;
use crate::task::{TaskState, TaskStatus};

pub const INGESTION_TASK: &str = "ingestion";
pub const DIRECTORY_SYNC_TASK: &str = "directory_sync";
pub const REPORT_TASK: &str = "monthly_report";

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_ingestion_interval_secs")]
    pub ingestion_interval_secs: u64,
    #[serde(default = "default_directory_sync_interval_secs")]
    pub directory_sync_interval_secs: u64,
    #[serde(default = "default_report_check_interval_secs")]
    pub report_check_interval_secs: u64,
    /// UTC hour (0-23) during which the report gate may fire
    #[serde(default = "default_report_hour_utc")]
    pub report_hour_utc: u32,
    #[serde(default = "default_max_concurrent_channels")]
    pub max_concurrent_channels: usize,
    /// Messages fetched per channel per run
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Budget for one channel scan
    #[serde(default = "default_channel_scan_timeout_secs")]
    pub channel_scan_timeout_secs: u64,
    /// How long shutdown waits for in-flight runs before aborting them
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_ingestion_interval_secs() -> u64 {
    3600
}

fn default_directory_sync_interval_secs() -> u64 {
    86_400
}

fn default_report_check_interval_secs() -> u64 {
    600
}

fn default_report_hour_utc() -> u32 {
    13
}

fn default_max_concurrent_channels() -> usize {
    4
}

fn default_page_size() -> usize {
    backblast_core::limits::DEFAULT_PAGE_SIZE
}

fn default_channel_scan_timeout_secs() -> u64 {
    300
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ingestion_interval_secs: default_ingestion_interval_secs(),
            directory_sync_interval_secs: default_directory_sync_interval_secs(),
            report_check_interval_secs: default_report_check_interval_secs(),
            report_hour_utc: default_report_hour_utc(),
            max_concurrent_channels: default_max_concurrent_channels(),
            page_size: default_page_size(),
            channel_scan_timeout_secs: default_channel_scan_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn channel_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_scan_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Rejects settings under which a task could never do useful work.
    pub fn check(&self) -> Result<()> {
        if self.report_hour_utc > 23 {
            return Err(Error::config(format!(
                "report_hour_utc must be 0-23, got {}",
                self.report_hour_utc
            )));
        }
        if self.max_concurrent_channels == 0 {
            return Err(Error::config("max_concurrent_channels must be at least 1"));
        }
        if self.page_size == 0 {
            return Err(Error::config("page_size must be at least 1"));
        }
        let intervals = [
            ("ingestion_interval_secs", self.ingestion_interval_secs),
            ("directory_sync_interval_secs", self.directory_sync_interval_secs),
            ("report_check_interval_secs", self.report_check_interval_secs),
            ("channel_scan_timeout_secs", self.channel_scan_timeout_secs),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                return Err(Error::config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

/// How one channel's scan ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelResult {
    Scanned(ScanOutcome),
    Failed { error: String },
}

/// One channel's part of an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub region: String,
    pub channel_id: ChannelId,
    pub result: ChannelResult,
    /// Checkpoint in effect after the scan
    pub checkpoint: ChannelCheckpoint,
}

impl ChannelReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, ChannelResult::Scanned(_))
    }
}

/// Aggregated outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub channels: Vec<ChannelReport>,
    /// Channel tasks that panicked or were cancelled
    pub lost: usize,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.channels.iter().filter(|c| c.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.channels.len() - self.succeeded() + self.lost
    }

    pub fn ingested(&self) -> usize {
        self.channels
            .iter()
            .map(|c| match &c.result {
                ChannelResult::Scanned(o) => o.ingested,
                ChannelResult::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn channel(&self, channel_id: ChannelId) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.channel_id == channel_id)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} channels ok, {} failed, {} records ingested",
            self.succeeded(),
            self.failed(),
            self.ingested()
        )
    }
}

/// Everything one spawned channel scan needs.
struct ChannelJob {
    miner: Arc<ChannelMiner>,
    tracker: Arc<CheckpointTracker>,
    clock: Arc<dyn Clock>,
    permits: Arc<Semaphore>,
    scan_timeout: Duration,
    region: String,
    namespace: String,
    channel: ChannelId,
}

impl ChannelJob {
    async fn run(self) -> ChannelReport {
        let m = metrics();

        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return self.report(ChannelResult::Failed {
                error: "scheduler shut down".to_string(),
            });
        };

        m.channels_in_flight.inc();
        let checkpoint = self.tracker.get(self.channel);
        let scan_started_at = self.clock.now();

        let result = match timeout(self.scan_timeout, self.miner.scan(&self.namespace, &checkpoint)).await {
            Ok(Ok(outcome)) => {
                m.channel_scans.inc();
                let proposed = checkpoint.advanced(outcome.highest_observed, scan_started_at);
                if let Err(e) = self.tracker.commit(proposed).await {
                    warn!(error = %e, "Failed to persist checkpoint");
                }
                info!(
                    fetched = outcome.fetched,
                    candidates = outcome.candidates,
                    ingested = outcome.ingested,
                    parse_failures = outcome.parse_failures,
                    other_failures = outcome.other_failures,
                    "Channel scanned"
                );
                ChannelResult::Scanned(outcome)
            }
            Ok(Err(e)) => {
                m.channel_scan_failures.inc();
                error!(error = %e, "Channel scan failed");
                ChannelResult::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                m.channel_scan_failures.inc();
                error!(timeout_secs = self.scan_timeout.as_secs(), "Channel scan timed out");
                ChannelResult::Failed {
                    error: format!("scan timed out after {:?}", self.scan_timeout),
                }
            }
        };

        m.channels_in_flight.dec();
        self.report(result)
    }

    fn report(&self, result: ChannelResult) -> ChannelReport {
        ChannelReport {
            region: self.region.clone(),
            channel_id: self.channel,
            result,
            checkpoint: self.tracker.get(self.channel),
        }
    }
}

/// Drives ingestion, directory sync, and report checks.
pub struct IngestionScheduler {
    config: SchedulerConfig,
    regions: Arc<Vec<RegionConfig>>,
    miner: Arc<ChannelMiner>,
    tracker: Arc<CheckpointTracker>,
    directory: Arc<DirectorySync>,
    reporter: Arc<MonthlyReporter>,
    clock: Arc<dyn Clock>,
    permits: Arc<Semaphore>,
    ingestion: Arc<TaskState>,
    directory_sync: Arc<TaskState>,
    report: Arc<TaskState>,
}

impl IngestionScheduler {
    pub fn new(
        config: SchedulerConfig,
        regions: Vec<RegionConfig>,
        miner: Arc<ChannelMiner>,
        tracker: Arc<CheckpointTracker>,
        directory: Arc<DirectorySync>,
        reporter: Arc<MonthlyReporter>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_channels.max(1)));
        Self {
            config,
            regions: Arc::new(regions),
            miner,
            tracker,
            directory,
            reporter,
            clock: Arc::new(SystemClock),
            permits,
            ingestion: TaskState::new(INGESTION_TASK),
            directory_sync: TaskState::new(DIRECTORY_SYNC_TASK),
            report: TaskState::new(REPORT_TASK),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }

    pub fn tracker(&self) -> &Arc<CheckpointTracker> {
        &self.tracker
    }

    pub fn task_statuses(&self) -> Vec<TaskStatus> {
        vec![
            self.ingestion.status(),
            self.directory_sync.status(),
            self.report.status(),
        ]
    }

    /// One ingestion run across every monitored channel of every region.
    ///
    /// Returns `None` without doing anything if a run is already in progress.
    pub async fn run_ingestion(&self) -> Option<RunReport> {
        let started_at = self.clock.now();
        let Some(guard) = self.ingestion.try_start(started_at) else {
            metrics().overlapping_runs_skipped.inc();
            warn!(task = INGESTION_TASK, "Previous run still in progress, skipping");
            return None;
        };

        let run_id = Uuid::new_v4();
        metrics().ingestion_runs.inc();
        info!(%run_id, regions = self.regions.len(), "Ingestion run started");

        let mut set = JoinSet::new();
        for region in self.regions.iter() {
            for &channel in &region.monitored_channels {
                let job = ChannelJob {
                    miner: self.miner.clone(),
                    tracker: self.tracker.clone(),
                    clock: self.clock.clone(),
                    permits: self.permits.clone(),
                    scan_timeout: self.config.channel_scan_timeout(),
                    region: region.name.clone(),
                    namespace: region.namespace.clone(),
                    channel,
                };
                let span = info_span!(
                    "channel_scan",
                    region = %region.name,
                    channel_id = %channel,
                    %run_id
                );
                set.spawn(job.run().instrument(span));
            }
        }

        let mut channels = Vec::new();
        let mut lost = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(report) => channels.push(report),
                Err(e) => {
                    lost += 1;
                    metrics().channel_scan_failures.inc();
                    error!(%run_id, error = %e, "Channel scan task aborted");
                }
            }
        }
        channels.sort_by(|a, b| (&a.region, a.channel_id).cmp(&(&b.region, b.channel_id)));

        let report = RunReport {
            run_id,
            started_at,
            finished_at: self.clock.now(),
            channels,
            lost,
        };

        let snapshot = metrics().snapshot();
        info!(
            %run_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            ingested = report.ingested(),
            records_upserted_total = snapshot.records_upserted,
            parse_failures_total = snapshot.parse_failures,
            scan_latency_mean_ms = snapshot.channel_scan_latency_mean_ms,
            "Ingestion run finished"
        );

        guard.finish(report.finished_at, report.summary());
        Some(report)
    }

    /// One directory sync pass. `None` if one is already running.
    pub async fn run_directory_sync(&self) -> Option<SyncSummary> {
        let Some(guard) = self.directory_sync.try_start(self.clock.now()) else {
            warn!(task = DIRECTORY_SYNC_TASK, "Previous run still in progress, skipping");
            return None;
        };

        let summary = self.directory.sync_all(&self.regions).await;
        guard.finish(
            self.clock.now(),
            format!("{} regions synced, {} failed", summary.synced, summary.failed),
        );
        Some(summary)
    }

    /// One evaluation of the report gate. Returns the number of regions
    /// posted (zero when the gate is closed), or `None` if a check is
    /// already running.
    pub async fn run_report_check(&self) -> Option<usize> {
        let now = self.clock.now();
        let Some(guard) = self.report.try_start(now) else {
            warn!(task = REPORT_TASK, "Previous run still in progress, skipping");
            return None;
        };

        let posted = self.reporter.check(now, &self.regions).await;
        guard.finish(self.clock.now(), format!("{} reports posted", posted));
        Some(posted)
    }

    /// Starts the three task loops. Each waits for `ready` to become true
    /// before its first run.
    ///
    /// Once `shutdown` becomes true the loops stop ticking and wait up to
    /// `shutdown_grace_secs` for in-flight runs, aborting whatever is left.
    /// The returned handles complete when that is done.
    pub fn start(
        self: Arc<Self>,
        ready: watch::Receiver<bool>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let handles = vec![
            self.spawn_loop(
                INGESTION_TASK,
                Duration::from_secs(self.config.ingestion_interval_secs),
                ready.clone(),
                shutdown.clone(),
                |s| async move {
                    s.run_ingestion().await;
                },
            ),
            self.spawn_loop(
                DIRECTORY_SYNC_TASK,
                Duration::from_secs(self.config.directory_sync_interval_secs),
                ready.clone(),
                shutdown.clone(),
                |s| async move {
                    s.run_directory_sync().await;
                },
            ),
            self.spawn_loop(
                REPORT_TASK,
                Duration::from_secs(self.config.report_check_interval_secs),
                ready,
                shutdown,
                |s| async move {
                    s.run_report_check().await;
                },
            ),
        ];

        info!("Scheduled tasks started");
        handles
    }

    fn spawn_loop<F, Fut>(
        self: &Arc<Self>,
        name: &'static str,
        period: Duration,
        mut ready: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
        run: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let scheduler = Arc::clone(self);
        let grace = self.config.shutdown_grace();
        tokio::spawn(async move {
            tokio::select! {
                is_ready = became_ready(&mut ready) => {
                    if !is_ready {
                        warn!(task = name, "Readiness signal dropped before ready, task not started");
                        return;
                    }
                }
                _ = stopped(&mut shutdown) => {
                    info!(task = name, "Shutdown before ready, task not started");
                    return;
                }
            }
            info!(task = name, period_secs = period.as_secs(), "Task loop started");

            let mut ticker = interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut runs = JoinSet::new();
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        runs.spawn(run(scheduler.clone()));
                    }
                    Some(joined) = runs.join_next(), if !runs.is_empty() => {
                        if let Err(e) = joined {
                            error!(task = name, error = %e, "Task run panicked");
                        }
                    }
                    _ = stopped(&mut shutdown) => break,
                }
            }

            drain_runs(name, runs, grace).await;
        })
    }
}

/// False if the sender was dropped before signalling readiness.
async fn became_ready(ready: &mut watch::Receiver<bool>) -> bool {
    ready.wait_for(|ready| *ready).await.is_ok()
}

/// Resolves once `shutdown` is true. A dropped sender never resolves.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Waits up to `grace` for in-flight runs, then aborts the rest.
async fn drain_runs(name: &'static str, mut runs: JoinSet<()>, grace: Duration) {
    if runs.is_empty() {
        info!(task = name, "Task loop stopped");
        return;
    }

    info!(task = name, in_flight = runs.len(), "Waiting for in-flight runs");
    let drained = timeout(grace, async {
        while runs.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            task = name,
            aborted = runs.len(),
            grace_secs = grace.as_secs(),
            "In-flight runs did not finish in time, aborting"
        );
        runs.abort_all();
        while runs.join_next().await.is_some() {}
    }
    info!(task = name, "Task loop stopped");
}
