//! Row types and insert helpers.

use crate::client::ClickHouseClient;
use backblast_core::{
    BackblastRecord, ChannelCheckpoint, DirectoryChannel, DirectoryUser, Error, Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

/// Days since 1970-01-01, the wire form of a ClickHouse `Date`.
pub fn date_to_days(date: NaiveDate) -> Result<u16> {
    let days = date.signed_duration_since(epoch_date()).num_days();
    u16::try_from(days).map_err(|_| Error::store(format!("date {} is out of storable range", date)))
}

/// Inverse of [`date_to_days`].
pub fn days_to_date(days: u16) -> NaiveDate {
    epoch_date() + chrono::Days::new(u64::from(days))
}

/// One row of `{ns}.beatdowns`.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct BeatdownRow {
    pub source_message_id: u64,
    pub ao_id: u64,
    pub q_user_id: u64,
    pub coq_user_id: Option<u64>,
    pub pax_count: u32,
    pub fngs_raw: String,
    pub fng_count: u32,
    /// Days since epoch
    pub bd_date: u16,
    pub pax: Vec<u64>,
    /// Milliseconds since epoch
    pub ingested_at: i64,
}

impl BeatdownRow {
    pub fn from_record(record: &BackblastRecord, ingested_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            source_message_id: record.source_message_id().get(),
            ao_id: record.ao_id().get(),
            q_user_id: record.q_user_id().get(),
            coq_user_id: record.coq_user_id().map(|u| u.get()),
            pax_count: record.pax_count(),
            fngs_raw: record.fngs_raw().to_string(),
            fng_count: record.fng_count(),
            bd_date: date_to_days(record.bd_date())?,
            pax: record.pax().iter().map(|u| u.get()).collect(),
            ingested_at: ingested_at.timestamp_millis(),
        })
    }
}

/// One row of `{ns}.aos`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct AoRow {
    pub channel_id: u64,
    pub name: String,
    pub synced_at: i64,
}

/// One row of `{ns}.users`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct UserRow {
    pub user_id: u64,
    pub username: String,
    pub display_name: Option<String>,
    pub is_bot: u8,
    pub synced_at: i64,
}

/// One row of `{base}.channel_checkpoints`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct CheckpointRow {
    pub channel_id: u64,
    pub last_mined_at: i64,
}

impl From<&ChannelCheckpoint> for CheckpointRow {
    fn from(cp: &ChannelCheckpoint) -> Self {
        Self {
            channel_id: cp.channel_id.get(),
            last_mined_at: cp.last_mined_at.timestamp_millis(),
        }
    }
}

impl CheckpointRow {
    pub fn into_checkpoint(self) -> Result<ChannelCheckpoint> {
        let at = DateTime::<Utc>::from_timestamp_millis(self.last_mined_at).ok_or_else(|| {
            Error::store(format!(
                "checkpoint for channel {} has invalid timestamp {}",
                self.channel_id, self.last_mined_at
            ))
        })?;
        Ok(ChannelCheckpoint::new(self.channel_id.into(), at))
    }
}

/// Writes `rows` to `table` in the given database (base database if `None`).
pub async fn insert_rows<T>(
    client: &ClickHouseClient,
    database: Option<&str>,
    table: &str,
    rows: &[T],
) -> Result<()>
where
    T: Row + Serialize,
{
    if rows.is_empty() {
        return Ok(());
    }

    let conn = client.checkout(database).await?;
    client
        .timed(table, async {
            let mut insert = conn.insert::<T>(table)?;
            for row in rows {
                insert.write(row).await?;
            }
            insert.end().await
        })
        .await?;

    debug!(table, database = database.unwrap_or("<base>"), rows = rows.len(), "Inserted rows");
    Ok(())
}

/// Upserts one record into `{namespace}.beatdowns`.
pub async fn upsert_beatdown(
    client: &ClickHouseClient,
    namespace: &str,
    record: &BackblastRecord,
) -> Result<()> {
    let start = Instant::now();
    let row = BeatdownRow::from_record(record, Utc::now())?;

    insert_rows(client, Some(namespace), "beatdowns", std::slice::from_ref(&row)).await?;

    let m = metrics();
    m.records_upserted.inc();
    m.upsert_latency_ms.observe(start.elapsed().as_millis() as u64);
    Ok(())
}

/// Writes one directory snapshot into `{namespace}.aos` and `{namespace}.users`.
pub async fn insert_directory(
    client: &ClickHouseClient,
    namespace: &str,
    channels: &[DirectoryChannel],
    users: &[DirectoryUser],
) -> Result<()> {
    let synced_at = Utc::now().timestamp_millis();

    let aos: Vec<AoRow> = channels
        .iter()
        .map(|c| AoRow {
            channel_id: c.id.get(),
            name: c.name.clone(),
            synced_at,
        })
        .collect();
    let users: Vec<UserRow> = users
        .iter()
        .map(|u| UserRow {
            user_id: u.id.get(),
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            is_bot: u8::from(u.is_bot),
            synced_at,
        })
        .collect();

    insert_rows(client, Some(namespace), "aos", &aos).await?;
    insert_rows(client, Some(namespace), "users", &users).await
}

/// Persists one checkpoint into the base database.
pub async fn save_checkpoint(client: &ClickHouseClient, checkpoint: &ChannelCheckpoint) -> Result<()> {
    let row = CheckpointRow::from(checkpoint);
    insert_rows(client, None, "channel_checkpoints", std::slice::from_ref(&row)).await
}
