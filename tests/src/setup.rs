//! Common test setup.

use api::{router, AppState};
use axum::Router;
use backblast_core::{BackblastParser, ParserConfig, RegionConfig};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use worker::{
    ChannelMiner, CheckpointTracker, DirectorySync, IngestionScheduler, ManualClock,
    MonthlyReporter, SchedulerConfig,
};

use crate::fixtures;
use crate::mocks::{MockPlatform, MockStore};

/// Scheduler wired to in-memory platform and store mocks.
///
/// Everything between the seams is production code: the real scheduler,
/// miner, parser, checkpoint tracker and router.
pub struct TestContext {
    pub platform: Arc<MockPlatform>,
    pub store: Arc<MockStore>,
    pub clock: Arc<ManualClock>,
    pub tracker: Arc<CheckpointTracker>,
    pub scheduler: Arc<IngestionScheduler>,
    pub router: Router,
}

impl TestContext {
    /// Context with default scheduler settings. The clock starts one day
    /// after the fixture base time, so fixture messages are in the past.
    pub fn new(regions: Vec<RegionConfig>) -> Self {
        Self::with_config(regions, SchedulerConfig::default())
    }

    pub fn with_config(regions: Vec<RegionConfig>, config: SchedulerConfig) -> Self {
        Self::build(
            regions,
            config,
            Arc::new(MockStore::new()),
            fixtures::at_minute(24 * 60),
        )
    }

    /// Context sharing `store` (and its checkpoints) with an earlier one,
    /// as after a process restart.
    pub fn restarted(
        regions: Vec<RegionConfig>,
        config: SchedulerConfig,
        store: Arc<MockStore>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(regions, config, store, now)
    }

    fn build(
        regions: Vec<RegionConfig>,
        config: SchedulerConfig,
        store: Arc<MockStore>,
        now: DateTime<Utc>,
    ) -> Self {
        let platform = Arc::new(MockPlatform::new());
        platform.add_known_channels([fixtures::AO_CHANNEL]);

        let parser = Arc::new(BackblastParser::new(ParserConfig {
            lookup_timeout: Duration::from_millis(500),
            ..ParserConfig::default()
        }));
        let miner = Arc::new(ChannelMiner::from_platform(
            platform.clone(),
            store.clone(),
            parser,
            config.page_size,
        ));
        let tracker = Arc::new(CheckpointTracker::new(store.clone()));
        let directory = Arc::new(DirectorySync::new(platform.clone(), store.clone()));
        let reporter = Arc::new(MonthlyReporter::new(
            store.clone(),
            platform.clone(),
            config.report_hour_utc,
        ));

        let clock = Arc::new(ManualClock::new(now));
        let scheduler = Arc::new(
            IngestionScheduler::new(config, regions, miner, tracker.clone(), directory, reporter)
                .with_clock(clock.clone()),
        );
        let router = router(AppState::new(scheduler.clone()));

        Self {
            platform,
            store,
            clock,
            tracker,
            scheduler,
            router,
        }
    }
}
