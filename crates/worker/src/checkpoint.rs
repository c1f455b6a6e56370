//! Checkpoint tracker.
//!
//! Holds the latest `last_mined_at` per channel for the process lifetime
//! and persists every commit through the [`CheckpointStore`]. Commits never
//! move a checkpoint backwards.

use backblast_core::{ChannelCheckpoint, ChannelId, CheckpointStore, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct CheckpointTracker {
    store: Arc<dyn CheckpointStore>,
    checkpoints: RwLock<HashMap<ChannelId, ChannelCheckpoint>>,
}

impl CheckpointTracker {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            checkpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Loads persisted checkpoints, keeping whichever value is later for
    /// channels already tracked in memory.
    pub async fn load(&self) -> Result<usize> {
        let loaded = self.store.load_checkpoints().await?;
        let count = loaded.len();

        let mut checkpoints = self.checkpoints.write();
        for cp in loaded {
            checkpoints
                .entry(cp.channel_id)
                .and_modify(|existing| {
                    if cp.last_mined_at > existing.last_mined_at {
                        *existing = cp;
                    }
                })
                .or_insert(cp);
        }

        info!(count, "Loaded channel checkpoints");
        Ok(count)
    }

    /// Current checkpoint for `channel` (the epoch if never scanned).
    pub fn get(&self, channel: ChannelId) -> ChannelCheckpoint {
        self.checkpoints
            .read()
            .get(&channel)
            .copied()
            .unwrap_or_else(|| ChannelCheckpoint::initial(channel))
    }

    /// Persists `proposed` and makes it current, unless the tracked value is
    /// already at or past it. Returns the checkpoint now in effect.
    pub async fn commit(&self, proposed: ChannelCheckpoint) -> Result<ChannelCheckpoint> {
        let current = self.get(proposed.channel_id);
        if proposed.last_mined_at <= current.last_mined_at {
            return Ok(current);
        }

        self.store.save_checkpoint(&proposed).await?;

        let mut checkpoints = self.checkpoints.write();
        let entry = checkpoints
            .entry(proposed.channel_id)
            .or_insert(proposed);
        if proposed.last_mined_at > entry.last_mined_at {
            *entry = proposed;
        }

        debug!(
            channel_id = %proposed.channel_id,
            last_mined_at = %entry.last_mined_at,
            "Committed checkpoint"
        );
        Ok(*entry)
    }

    pub fn snapshot(&self) -> Vec<ChannelCheckpoint> {
        self.checkpoints.read().values().copied().collect()
    }
}
