//! Per-channel scan checkpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChannelId;

/// How far ingestion has progressed in one channel.
///
/// Every message with a timestamp at or before `last_mined_at` has been
/// scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCheckpoint {
    pub channel_id: ChannelId,
    pub last_mined_at: DateTime<Utc>,
}

impl ChannelCheckpoint {
    pub fn new(channel_id: ChannelId, last_mined_at: DateTime<Utc>) -> Self {
        Self {
            channel_id,
            last_mined_at,
        }
    }

    /// Checkpoint for a channel that has never been scanned.
    pub fn initial(channel_id: ChannelId) -> Self {
        Self::new(channel_id, DateTime::<Utc>::UNIX_EPOCH)
    }

    /// The checkpoint after a scan that started at `scan_started_at` and
    /// observed messages up to `highest_observed`.
    ///
    /// Never moves backwards and never passes the scan start.
    pub fn advanced(
        &self,
        highest_observed: Option<DateTime<Utc>>,
        scan_started_at: DateTime<Utc>,
    ) -> Self {
        let proposed = highest_observed
            .map(|ts| ts.min(scan_started_at))
            .unwrap_or(self.last_mined_at);
        Self::new(self.channel_id, self.last_mined_at.max(proposed))
    }
}
