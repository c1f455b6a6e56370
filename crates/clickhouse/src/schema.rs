//! ClickHouse table schemas.
//!
//! Each region gets its own database named after its namespace. The only
//! process-wide table, `channel_checkpoints`, lives in the base database.
//! Namespaces are validated to `[a-z0-9_]+` before they reach this module,
//! so they are safe to splice into DDL.

/// SQL for creating a database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {database}")
}

/// SQL for creating the beatdowns table.
///
/// Rows are keyed by the source message id; re-ingesting a message
/// replaces the earlier row once parts merge (reads use `FINAL`).
pub fn create_beatdowns_table(namespace: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {namespace}.beatdowns (
    source_message_id UInt64,
    ao_id UInt64,
    q_user_id UInt64,
    coq_user_id Nullable(UInt64),
    pax_count UInt32,
    fngs_raw String,
    fng_count UInt32,
    bd_date Date,
    pax Array(UInt64),
    ingested_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(ingested_at)
PARTITION BY toYYYYMM(bd_date)
ORDER BY source_message_id
"#
    )
}

/// SQL for creating the AO directory table.
pub fn create_aos_table(namespace: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {namespace}.aos (
    channel_id UInt64,
    name String,
    synced_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(synced_at)
ORDER BY channel_id
"#
    )
}

/// SQL for creating the user directory table.
pub fn create_users_table(namespace: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {namespace}.users (
    user_id UInt64,
    username String,
    display_name Nullable(String),
    is_bot UInt8,
    synced_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(synced_at)
ORDER BY user_id
"#
    )
}

/// SQL for creating the checkpoint table in the base database.
pub fn create_checkpoints_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.channel_checkpoints (
    channel_id UInt64,
    last_mined_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(last_mined_at)
ORDER BY channel_id
"#
    )
}

/// All DDL for the base database and the given region namespaces, in
/// execution order.
pub fn all_statements<'a>(
    base_database: &str,
    namespaces: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut statements = vec![
        create_database(base_database),
        create_checkpoints_table(base_database),
    ];
    for ns in namespaces {
        statements.push(create_database(ns));
        statements.push(create_beatdowns_table(ns));
        statements.push(create_aos_table(ns));
        statements.push(create_users_table(ns));
    }
    statements
}
