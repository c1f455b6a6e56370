//! Scheduler task behavior: overlap guard, readiness, directory sync and
//! the report gate.

use backblast_core::{AoMonthlySummary, ChannelId, DirectoryChannel, DirectoryUser, GuildId, UserId};
use chrono::{TimeZone, Utc};
use integration_tests::{
    fixtures::{self, at_minute},
    setup::TestContext,
};
use std::time::Duration;
use tokio::sync::watch;
use worker::{SchedulerConfig, DIRECTORY_SYNC_TASK, INGESTION_TASK, REPORT_TASK};

const NS: &str = "f3_test";

/// A second ingestion run is refused while the first is still going.
#[tokio::test(start_paused = true)]
async fn test_overlapping_run_is_skipped() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    ctx.platform.set_fetch_delay(Some(Duration::from_secs(10)));
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(1))]);

    let scheduler = ctx.scheduler.clone();
    let first = tokio::spawn(async move { scheduler.run_ingestion().await });
    while !ctx.scheduler.task_statuses()[0].running {
        tokio::task::yield_now().await;
    }

    assert!(ctx.scheduler.run_ingestion().await.is_none());

    let report = first.await.unwrap().expect("first run completes");
    assert_eq!(report.ingested(), 1);

    let status = &ctx.scheduler.task_statuses()[0];
    assert_eq!(status.name, INGESTION_TASK);
    assert!(!status.running);
    assert_eq!(status.runs, 1);
    assert_eq!(status.skipped_overlaps, 1);
    assert!(status.last_outcome.as_deref().unwrap().contains("1 records ingested"));

    // Idle again: the next run goes ahead.
    assert!(ctx.scheduler.run_ingestion().await.is_some());
}

/// Task loops do nothing until readiness is signalled.
#[tokio::test(start_paused = true)]
async fn test_tasks_wait_for_readiness() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    let (ready_tx, ready_rx) = watch::channel(false);
    let (stop_tx, stop_rx) = watch::channel(false);

    let handles = ctx.scheduler.clone().start(ready_rx, stop_rx);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(ctx.platform.fetch_calls(), 0);

    ready_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ctx.platform.fetch_calls(), 1);

    stop_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }
}

/// Shutdown before readiness ends the loops without a run.
#[tokio::test(start_paused = true)]
async fn test_shutdown_before_ready() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    let (_ready_tx, ready_rx) = watch::channel(false);
    let (stop_tx, stop_rx) = watch::channel(false);

    let handles = ctx.scheduler.clone().start(ready_rx, stop_rx);
    stop_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(ctx.platform.fetch_calls(), 0);
    assert!(ctx.scheduler.task_statuses().iter().all(|s| s.runs == 0));
}

async fn wait_until_ingesting(ctx: &TestContext) {
    while !ctx.scheduler.task_statuses()[0].running {
        tokio::task::yield_now().await;
    }
}

/// A run in flight at shutdown is allowed to finish within the grace period.
#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_in_flight_run() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    ctx.platform.set_fetch_delay(Some(Duration::from_secs(10)));
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(1))]);

    let (_ready_tx, ready_rx) = watch::channel(true);
    let (stop_tx, stop_rx) = watch::channel(false);
    let handles = ctx.scheduler.clone().start(ready_rx, stop_rx);
    wait_until_ingesting(&ctx).await;

    stop_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(ctx.store.record_count(), 1);
    let status = &ctx.scheduler.task_statuses()[0];
    assert!(!status.running);
    assert_eq!(status.runs, 1);
    assert!(status.last_outcome.as_deref().unwrap().contains("1 records ingested"));
    assert_eq!(ctx.tracker.get(ChannelId(500)).last_mined_at, at_minute(1));
}

/// A run still going when the grace period ends is aborted and its
/// checkpoint is left alone.
#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_run_past_grace() {
    let config = SchedulerConfig {
        shutdown_grace_secs: 1,
        ..SchedulerConfig::default()
    };
    let ctx = TestContext::with_config(vec![fixtures::region("Test", NS, &[500])], config);
    ctx.platform.set_fetch_delay(Some(Duration::from_secs(60)));
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(1))]);

    let (_ready_tx, ready_rx) = watch::channel(true);
    let (stop_tx, stop_rx) = watch::channel(false);
    let handles = ctx.scheduler.clone().start(ready_rx, stop_rx);
    wait_until_ingesting(&ctx).await;

    stop_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(ctx.store.record_count(), 0);
    assert!(ctx.store.checkpoint(ChannelId(500)).is_none());
    let status = &ctx.scheduler.task_statuses()[0];
    assert!(!status.running);
    assert_eq!(status.last_outcome.as_deref(), Some("aborted"));
}

#[tokio::test]
async fn test_directory_sync_stores_snapshot_per_region() {
    let mut south = fixtures::region("South", "f3_south", &[600]);
    south.guild_id = GuildId(2);
    let ctx = TestContext::new(vec![fixtures::region("North", "f3_north", &[500]), south]);

    ctx.platform.set_directory(
        vec![DirectoryChannel {
            id: ChannelId(222),
            name: "the-forge".to_string(),
        }],
        vec![DirectoryUser {
            id: UserId(111),
            username: "dredd".to_string(),
            display_name: Some("Judge Dredd".to_string()),
            is_bot: false,
        }],
    );
    ctx.platform.fail_guild(GuildId(2));

    let summary = ctx.scheduler.run_directory_sync().await.unwrap();
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.failed, 1);

    let (channels, users) = ctx.store.directory("f3_north").expect("north synced");
    assert_eq!(channels[0].name, "the-forge");
    assert_eq!(users[0].username, "dredd");
    assert!(ctx.store.directory("f3_south").is_none());

    let status = &ctx.scheduler.task_statuses()[1];
    assert_eq!(status.name, DIRECTORY_SYNC_TASK);
    assert_eq!(status.runs, 1);
}

/// The report gate opens once per day during the report hour and reports
/// the month that just ended.
#[tokio::test]
async fn test_report_gate_fires_once_in_report_hour() {
    let config = SchedulerConfig {
        report_hour_utc: 13,
        ..SchedulerConfig::default()
    };
    let ctx = TestContext::with_config(vec![fixtures::region("Puget Sound", NS, &[500])], config);
    ctx.store.set_summaries(vec![AoMonthlySummary {
        ao_id: ChannelId(222),
        ao_name: "the-forge".to_string(),
        total_posts: 30,
        unique_pax: 12,
        beatdowns: 4,
        total_fngs: 2,
    }]);

    ctx.clock.set(Utc.with_ymd_and_hms(2023, 6, 1, 12, 50, 0).unwrap());
    assert_eq!(ctx.scheduler.run_report_check().await, Some(0));

    ctx.clock.set(Utc.with_ymd_and_hms(2023, 6, 1, 13, 5, 0).unwrap());
    assert_eq!(ctx.scheduler.run_report_check().await, Some(1));

    ctx.clock.set(Utc.with_ymd_and_hms(2023, 6, 1, 13, 15, 0).unwrap());
    assert_eq!(ctx.scheduler.run_report_check().await, Some(0));

    assert_eq!(ctx.store.summary_requests(), vec![(NS.to_string(), 2023, 5)]);

    let posts = ctx.platform.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, ChannelId(999));
    assert!(posts[0].1.contains("Puget Sound"));
    assert!(posts[0].1.contains("May 2023"));
    assert!(posts[0].1.contains("the-forge"));

    let status = &ctx.scheduler.task_statuses()[2];
    assert_eq!(status.name, REPORT_TASK);
    assert_eq!(status.runs, 3);
}
