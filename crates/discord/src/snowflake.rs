//! Timestamp <-> snowflake conversion.
//!
//! A Discord snowflake stores milliseconds since the Discord epoch in its
//! upper 42 bits.

use chrono::{DateTime, TimeZone, Utc};

/// 2015-01-01T00:00:00Z in Unix milliseconds.
pub const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

const TIMESTAMP_SHIFT: u32 = 22;
const LOW_BITS: u64 = (1 << TIMESTAMP_SHIFT) - 1;

/// The largest snowflake created in the same millisecond as `ts`, so that
/// `after=<this>` returns only messages strictly later than `ts`.
pub fn snowflake_after(ts: DateTime<Utc>) -> u64 {
    let ms = (ts.timestamp_millis() - DISCORD_EPOCH_MS).max(0) as u64;
    (ms << TIMESTAMP_SHIFT) | LOW_BITS
}

/// Creation time encoded in a snowflake.
pub fn snowflake_timestamp(id: u64) -> DateTime<Utc> {
    let ms = (id >> TIMESTAMP_SHIFT) as i64 + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
