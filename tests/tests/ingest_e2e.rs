//! End-to-end ingestion tests.
//!
//! Each test drives the real scheduler, miner, parser and checkpoint
//! tracker against in-memory platform and store mocks:
//! scheduler → channel miner → parser → attendance store, with replies
//! captured by the mock platform.

use backblast_core::{ChannelId, MessageId, UserId};
use chrono::NaiveDate;
use integration_tests::{
    fixtures::{self, at_minute},
    setup::TestContext,
};
use worker::{ChannelResult, SchedulerConfig};

const NS: &str = "f3_test";

/// The canonical example backblast becomes exactly the expected record.
#[tokio::test]
async fn test_example_backblast_is_ingested() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(60))]);

    let report = ctx.scheduler.run_ingestion().await.expect("run should start");
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.ingested(), 1);

    let records = ctx.store.records(NS);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.q_user_id(), UserId(111));
    assert_eq!(record.coq_user_id(), None);
    assert_eq!(record.pax_count(), 5);
    assert_eq!(record.fng_count(), 0);
    assert_eq!(record.fngs_raw(), "none");
    assert_eq!(record.bd_date(), NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
    assert_eq!(record.ao_id(), fixtures::AO_CHANNEL);
    assert_eq!(record.pax(), &[UserId(111), UserId(333), UserId(444)]);
    assert_eq!(record.source_message_id(), MessageId(1));

    assert!(ctx.platform.replies().is_empty(), "valid posts get no reply");

    let checkpoint = ctx.store.checkpoint(ChannelId(500)).expect("checkpoint persisted");
    assert_eq!(checkpoint.last_mined_at, at_minute(60));
    assert_eq!(ctx.tracker.get(ChannelId(500)), checkpoint);
}

/// Re-scanning a window that was already ingested stores no duplicates.
#[tokio::test]
async fn test_rescanned_message_is_stored_once() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(60))]);

    // Checkpoint persistence fails, so the second run sees the same window.
    ctx.store.set_fail_checkpoints(true);
    ctx.scheduler.run_ingestion().await.unwrap();
    ctx.scheduler.run_ingestion().await.unwrap();

    assert_eq!(ctx.store.upsert_calls(), 2);
    assert_eq!(ctx.store.record_count(), 1);
    assert_eq!(ctx.store.records(NS)[0].source_message_id(), MessageId(1));
}

/// Only human-authored messages starting with "backblast" are parsed.
#[tokio::test]
async fn test_only_backblast_candidates_are_processed() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    let channel = ChannelId(500);
    ctx.platform.push_messages([
        fixtures::bot_message(1, channel, at_minute(1)),
        fixtures::chat_message(2, channel, at_minute(2), "great work this morning"),
        fixtures::chat_message(3, channel, at_minute(3), "Q: <@111>\nthis is not a backblast"),
        fixtures::example_message(4, channel, at_minute(4)),
        fixtures::chat_message(5, channel, at_minute(5), "   BACKBLAST!\nsomething went sideways"),
    ]);

    let report = ctx.scheduler.run_ingestion().await.unwrap();
    let ChannelResult::Scanned(outcome) = &report.channel(channel).unwrap().result else {
        panic!("channel scan should succeed");
    };
    assert_eq!(outcome.fetched, 5);
    assert_eq!(outcome.candidates, 2);
    assert_eq!(outcome.ingested, 1);
    assert_eq!(outcome.parse_failures, 1);
    assert_eq!(outcome.highest_observed, Some(at_minute(5)));

    assert_eq!(ctx.store.record_count(), 1);
    let replies = ctx.platform.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].message_id, MessageId(5));
    assert_eq!(replies[0].channel_id, channel);

    // Non-candidates still advance the checkpoint.
    assert_eq!(ctx.tracker.get(channel).last_mined_at, at_minute(5));
}

/// A channel whose fetch fails does not stop other channels, and keeps its
/// checkpoint where it was.
#[tokio::test]
async fn test_failing_channel_is_isolated() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500, 501])]);
    ctx.platform.fail_channel(ChannelId(500));
    ctx.platform.push_messages([
        fixtures::example_message(1, ChannelId(500), at_minute(1)),
        fixtures::example_message(2, ChannelId(501), at_minute(2)),
    ]);

    let report = ctx.scheduler.run_ingestion().await.unwrap();
    assert_eq!(report.channels.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.channel(ChannelId(500)).unwrap().result,
        ChannelResult::Failed { .. }
    ));

    assert_eq!(ctx.store.records(NS).len(), 1);
    assert_eq!(ctx.store.records(NS)[0].source_message_id(), MessageId(2));
    assert_eq!(ctx.store.checkpoint(ChannelId(500)), None);
    assert_eq!(ctx.tracker.get(ChannelId(501)).last_mined_at, at_minute(2));
}

/// A hung channel is cut off by the scan budget and the run still ends.
#[tokio::test(start_paused = true)]
async fn test_hung_channel_times_out() {
    let config = SchedulerConfig {
        channel_scan_timeout_secs: 5,
        ..SchedulerConfig::default()
    };
    let ctx = TestContext::with_config(vec![fixtures::region("Test", NS, &[500, 501])], config);
    ctx.platform.hang_channel(ChannelId(500));
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(501), at_minute(1))]);

    let report = ctx.scheduler.run_ingestion().await.unwrap();

    match &report.channel(ChannelId(500)).unwrap().result {
        ChannelResult::Failed { error } => assert!(error.contains("timed out"), "{error}"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(report.channel(ChannelId(501)).unwrap().is_success());
    assert_eq!(ctx.store.record_count(), 1);
}

/// Backlog beyond the page size is picked up by later runs, never skipped.
#[tokio::test]
async fn test_backlog_is_drained_across_runs() {
    let config = SchedulerConfig {
        page_size: 2,
        ..SchedulerConfig::default()
    };
    let ctx = TestContext::with_config(vec![fixtures::region("Test", NS, &[500])], config);
    let channel = ChannelId(500);
    ctx.platform.push_messages(
        (1..=5).map(|i| fixtures::example_message(i, channel, at_minute(i as i64))),
    );

    let expected = [(2, 2), (4, 4), (5, 5), (5, 5)];
    for (records, minute) in expected {
        let before = ctx.tracker.get(channel);
        ctx.scheduler.run_ingestion().await.unwrap();
        let after = ctx.tracker.get(channel);

        assert_eq!(ctx.store.record_count(), records);
        assert_eq!(after.last_mined_at, at_minute(minute));
        assert!(after.last_mined_at >= before.last_mined_at);
    }
}

/// Messages newer than the scan start are ingested, but the checkpoint
/// stops at the scan start so they are seen again rather than skipped.
#[tokio::test]
async fn test_checkpoint_never_passes_scan_start() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    ctx.clock.set(at_minute(30));
    ctx.platform.push_messages([
        fixtures::example_message(1, ChannelId(500), at_minute(10)),
        fixtures::example_message(2, ChannelId(500), at_minute(45)),
    ]);

    ctx.scheduler.run_ingestion().await.unwrap();
    assert_eq!(ctx.tracker.get(ChannelId(500)).last_mined_at, at_minute(30));
    assert_eq!(ctx.store.record_count(), 2);

    ctx.clock.set(at_minute(60));
    ctx.scheduler.run_ingestion().await.unwrap();
    assert_eq!(ctx.tracker.get(ChannelId(500)).last_mined_at, at_minute(45));
    assert_eq!(ctx.store.record_count(), 2);
    assert_eq!(ctx.store.upsert_calls(), 3);
}

/// Persisted checkpoints stop a restarted process from re-scanning history.
#[tokio::test]
async fn test_checkpoints_survive_restart() {
    let regions = vec![fixtures::region("Test", NS, &[500])];
    let ctx = TestContext::new(regions.clone());
    ctx.platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(1))]);
    ctx.scheduler.run_ingestion().await.unwrap();

    let restarted = TestContext::restarted(
        regions,
        SchedulerConfig::default(),
        ctx.store.clone(),
        at_minute(24 * 60),
    );
    restarted
        .platform
        .push_messages([fixtures::example_message(1, ChannelId(500), at_minute(1))]);
    restarted.tracker.load().await.unwrap();

    let report = restarted.scheduler.run_ingestion().await.unwrap();
    let ChannelResult::Scanned(outcome) = &report.channel(ChannelId(500)).unwrap().result else {
        panic!("channel scan should succeed");
    };
    assert_eq!(outcome.fetched, 0);
    assert_eq!(ctx.store.upsert_calls(), 1);
}

/// Each region's records land in its own namespace.
#[tokio::test]
async fn test_regions_write_to_their_own_namespace() {
    let ctx = TestContext::new(vec![
        fixtures::region("North", "f3_north", &[500]),
        fixtures::region("South", "f3_south", &[600, 601]),
    ]);
    ctx.platform.push_messages([
        fixtures::example_message(1, ChannelId(500), at_minute(1)),
        fixtures::example_message(2, ChannelId(600), at_minute(2)),
        fixtures::example_message(3, ChannelId(601), at_minute(3)),
    ]);

    let report = ctx.scheduler.run_ingestion().await.unwrap();
    assert_eq!(report.succeeded(), 3);
    assert_eq!(ctx.store.records("f3_north").len(), 1);
    assert_eq!(ctx.store.records("f3_south").len(), 2);
}

/// Channel scans run concurrently but never beyond the configured bound.
#[tokio::test(start_paused = true)]
async fn test_fan_out_respects_concurrency_bound() {
    let config = SchedulerConfig {
        max_concurrent_channels: 2,
        ..SchedulerConfig::default()
    };
    let channels: Vec<u64> = (500..506).collect();
    let ctx = TestContext::with_config(vec![fixtures::region("Test", NS, &channels)], config);
    ctx.platform
        .set_fetch_delay(Some(std::time::Duration::from_millis(100)));

    let report = ctx.scheduler.run_ingestion().await.unwrap();
    assert_eq!(report.succeeded(), 6);
    assert_eq!(ctx.platform.fetch_calls(), 6);
    assert_eq!(ctx.platform.max_fetches_in_flight(), 2);
}

/// Q with two mentions records a co-Q; multiple FNGs are counted.
#[tokio::test]
async fn test_coq_and_fng_count() {
    let ctx = TestContext::new(vec![fixtures::region("Test", NS, &[500])]);
    let mut message = fixtures::backblast_message(
        1,
        ChannelId(500),
        at_minute(1),
        111,
        "9",
        "2023-05-02",
        &[111, 222_000, 333],
    );
    message.content = message
        .content
        .replace("Q: <@111>", "Q: <@111> and <@!222000>")
        .replace("FNGs: none", "FNGs: John, Mary");
    ctx.platform.push_messages([message]);

    ctx.scheduler.run_ingestion().await.unwrap();

    let record = &ctx.store.records(NS)[0];
    assert_eq!(record.q_user_id(), UserId(111));
    assert_eq!(record.coq_user_id(), Some(UserId(222_000)));
    assert_eq!(record.fng_count(), 2);
    assert_eq!(record.pax_count(), 9);
    assert_eq!(record.pax(), &[UserId(111), UserId(222_000), UserId(333)]);
}
