//! Read queries: monthly summaries, checkpoints, and verification helpers.

use crate::client::ClickHouseClient;
use crate::insert::{BeatdownRow, CheckpointRow};
use backblast_core::{AoMonthlySummary, ChannelCheckpoint, Result};
use clickhouse::Row;
use serde::Deserialize;

/// Aggregated month of beatdowns for one AO.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct SummaryRow {
    pub ao_id: u64,
    pub ao_name: String,
    pub total_posts: u64,
    pub unique_pax: u64,
    pub beatdowns: u64,
    pub total_fngs: u64,
}

impl From<SummaryRow> for AoMonthlySummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            ao_id: row.ao_id.into(),
            ao_name: row.ao_name,
            total_posts: row.total_posts,
            unique_pax: row.unique_pax,
            beatdowns: row.beatdowns,
            total_fngs: row.total_fngs,
        }
    }
}

fn monthly_summary_sql(namespace: &str) -> String {
    format!(
        r#"
SELECT
    b.ao_id AS ao_id,
    any(a.name) AS ao_name,
    sum(b.pax_count) AS total_posts,
    length(groupUniqArrayArray(b.pax)) AS unique_pax,
    count() AS beatdowns,
    sum(b.fng_count) AS total_fngs
FROM (
    SELECT ao_id, pax_count, pax, fng_count
    FROM {namespace}.beatdowns FINAL
    WHERE toYear(bd_date) = ? AND toMonth(bd_date) = ?
) AS b
LEFT JOIN (
    SELECT channel_id, argMax(name, synced_at) AS name
    FROM {namespace}.aos
    GROUP BY channel_id
) AS a ON a.channel_id = b.ao_id
GROUP BY b.ao_id
ORDER BY b.ao_id
"#
    )
}

/// Per-AO stats for one calendar month of `namespace`.
pub async fn monthly_summary(
    client: &ClickHouseClient,
    namespace: &str,
    year: i32,
    month: u32,
) -> Result<Vec<AoMonthlySummary>> {
    let sql = monthly_summary_sql(namespace);
    let conn = client.checkout(Some(namespace)).await?;
    let rows: Vec<SummaryRow> = client
        .timed("monthly summary", conn.query(&sql).bind(year).bind(month).fetch_all())
        .await?;
    Ok(rows.into_iter().map(AoMonthlySummary::from).collect())
}

/// Latest checkpoint per channel from the base database.
pub async fn load_checkpoints(client: &ClickHouseClient) -> Result<Vec<ChannelCheckpoint>> {
    let conn = client.checkout(None).await?;
    let rows: Vec<CheckpointRow> = client
        .timed(
            "checkpoint load",
            conn.query(
                "SELECT channel_id, max(last_mined_at) AS last_mined_at \
                 FROM channel_checkpoints GROUP BY channel_id",
            )
            .fetch_all(),
        )
        .await?;
    rows.into_iter().map(CheckpointRow::into_checkpoint).collect()
}

/// Number of distinct backblasts stored for `namespace`.
pub async fn count_beatdowns(client: &ClickHouseClient, namespace: &str) -> Result<u64> {
    let conn = client.checkout(Some(namespace)).await?;
    client
        .timed(
            "beatdown count",
            conn.query("SELECT count() FROM beatdowns FINAL").fetch_one::<u64>(),
        )
        .await
}

/// Stored row for one source message, if any.
pub async fn find_beatdown(
    client: &ClickHouseClient,
    namespace: &str,
    source_message_id: u64,
) -> Result<Option<BeatdownRow>> {
    let conn = client.checkout(Some(namespace)).await?;
    client
        .timed(
            "beatdown lookup",
            conn.query(
                "SELECT ?fields FROM beatdowns FINAL WHERE source_message_id = ?",
            )
            .bind(source_message_id)
            .fetch_optional::<BeatdownRow>(),
        )
        .await
}
