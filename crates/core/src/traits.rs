//! Collaborator seams.
//!
//! The parser and miner only talk to the chat platform and the store
//! through these traits; production implementations live in the
//! `discord-client` and `clickhouse-client` crates, in-memory ones in the
//! integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::checkpoint::ChannelCheckpoint;
use crate::directory::{DirectoryChannel, DirectoryUser};
use crate::error::Result;
use crate::ids::{ChannelId, GuildId, MessageId};
use crate::message::ChatMessage;
use crate::record::BackblastRecord;
use crate::report::AoMonthlySummary;

/// Channel existence lookups (used to validate `AO:`).
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn channel_exists(&self, channel: ChannelId) -> Result<bool>;
}

/// Message history of the chat platform.
#[async_trait]
pub trait MessageSource: ChannelDirectory {
    /// Messages strictly after `after`, oldest first, at most `limit`.
    async fn fetch_history(
        &self,
        channel: ChannelId,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>>;
}

/// Outbound chat messages. Delivery is best-effort.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Replies to `message` in `channel`.
    async fn reply(&self, channel: ChannelId, message: MessageId, text: &str) -> Result<()>;

    /// Posts a standalone message to `channel`.
    async fn post(&self, channel: ChannelId, text: &str) -> Result<()>;
}

/// Idempotent record storage keyed by source message id.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn upsert_record(&self, namespace: &str, record: &BackblastRecord) -> Result<()>;
}

/// Durable checkpoint persistence.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load_checkpoints(&self) -> Result<Vec<ChannelCheckpoint>>;
    async fn save_checkpoint(&self, checkpoint: &ChannelCheckpoint) -> Result<()>;
}

/// Bulk guild directory reads.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<DirectoryChannel>>;
    async fn guild_members(&self, guild: GuildId) -> Result<Vec<DirectoryUser>>;
}

/// Bulk guild directory writes.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn store_directory(
        &self,
        namespace: &str,
        channels: &[DirectoryChannel],
        users: &[DirectoryUser],
    ) -> Result<()>;
}

/// Aggregations over stored records.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn monthly_summary(
        &self,
        namespace: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<AoMonthlySummary>>;
}
