//! ClickHouse store tests.
//!
//! Requires Docker (or `BACKBLAST_TEST_CLICKHOUSE_URL`); run with
//! `--ignored`.

use backblast_core::{
    AttendanceStore, BackblastParser, BackblastRecord, ChannelCheckpoint, ChannelId,
    CheckpointStore, DirectoryChannel, DirectoryStore, MessageId, ParseInput, ReportStore,
};
use chrono::{Duration, Utc};
use clickhouse_client::{count_beatdowns, find_beatdown, health::init_schema, ClickHouseStore};
use integration_tests::{containers::TestContainers, fixtures, mocks::MockPlatform};
use uuid::Uuid;

fn unique_namespace() -> String {
    format!("bb_test_{}", Uuid::new_v4().simple())
}

async fn example_record(message_id: u64, text: &str) -> BackblastRecord {
    let platform = MockPlatform::new();
    platform.add_known_channels([fixtures::AO_CHANNEL]);
    BackblastParser::default()
        .parse(
            ParseInput {
                message_id: MessageId(message_id),
                text,
                mentions: &fixtures::example_mentions(),
            },
            &platform,
        )
        .await
        .expect("fixture backblast parses")
}

/// Upserting the same message twice leaves one row with the latest values.
#[tokio::test]
#[ignore = "requires ClickHouse"]
async fn test_upsert_is_idempotent() {
    let containers = TestContainers::start().await;
    let client = containers.client(4);
    let ns = unique_namespace();
    init_schema(&client, [ns.as_str()]).await.unwrap();
    let store = ClickHouseStore::new(client.clone());

    let first = example_record(1, fixtures::EXAMPLE_BACKBLAST).await;
    let edited = example_record(1, &fixtures::EXAMPLE_BACKBLAST.replace("Count: 5", "Count: 6")).await;

    store.upsert_record(&ns, &first).await.unwrap();
    store.upsert_record(&ns, &edited).await.unwrap();

    assert_eq!(count_beatdowns(&client, &ns).await.unwrap(), 1);
    let row = find_beatdown(&client, &ns, 1).await.unwrap().expect("row stored");
    assert_eq!(row.pax_count, 6);
    assert_eq!(row.ao_id, 222);
    assert_eq!(row.pax, vec![111, 333, 444]);
    assert_eq!(row.coq_user_id, None);
}

/// Checkpoints load back as the latest value per channel.
#[tokio::test]
#[ignore = "requires ClickHouse"]
async fn test_checkpoints_round_trip() {
    let containers = TestContainers::start().await;
    let client = containers.client(4);
    init_schema(&client, std::iter::empty::<&str>()).await.unwrap();
    let store = ClickHouseStore::new(client);

    let channel = ChannelId(Utc::now().timestamp_micros() as u64);
    let later = Utc::now();
    let earlier = later - Duration::hours(1);

    store
        .save_checkpoint(&ChannelCheckpoint::new(channel, later))
        .await
        .unwrap();
    store
        .save_checkpoint(&ChannelCheckpoint::new(channel, earlier))
        .await
        .unwrap();

    let loaded = store.load_checkpoints().await.unwrap();
    let cp = loaded
        .iter()
        .find(|cp| cp.channel_id == channel)
        .expect("checkpoint loaded");
    assert_eq!(cp.last_mined_at.timestamp_millis(), later.timestamp_millis());
}

/// Monthly summary aggregates per AO and picks up directory names.
#[tokio::test]
#[ignore = "requires ClickHouse"]
async fn test_monthly_summary() {
    let containers = TestContainers::start().await;
    let client = containers.client(4);
    let ns = unique_namespace();
    init_schema(&client, [ns.as_str()]).await.unwrap();
    let store = ClickHouseStore::new(client);

    store
        .store_directory(
            &ns,
            &[DirectoryChannel {
                id: fixtures::AO_CHANNEL,
                name: "the-forge".to_string(),
            }],
            &[],
        )
        .await
        .unwrap();

    let may_1 = example_record(1, fixtures::EXAMPLE_BACKBLAST).await;
    let may_8 = example_record(
        2,
        &fixtures::EXAMPLE_BACKBLAST
            .replace("Date: 2023-05-01", "Date: 2023-05-08")
            .replace("Count: 5", "Count: 3")
            .replace("FNGs: none", "FNGs: Ann")
            .replace("PAX: <@111> <@333> <@444>", "PAX: <@111> <@333>"),
    )
    .await;
    let june = example_record(
        3,
        &fixtures::EXAMPLE_BACKBLAST.replace("Date: 2023-05-01", "Date: 2023-06-01"),
    )
    .await;
    for record in [&may_1, &may_8, &june] {
        store.upsert_record(&ns, record).await.unwrap();
    }

    let rows = store.monthly_summary(&ns, 2023, 5).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.ao_id, fixtures::AO_CHANNEL);
    assert_eq!(row.ao_name, "the-forge");
    assert_eq!(row.beatdowns, 2);
    assert_eq!(row.total_posts, 8);
    assert_eq!(row.unique_pax, 3);
    assert_eq!(row.total_fngs, 1);
    assert_eq!(row.avg_attendance(), 4.0);
}
