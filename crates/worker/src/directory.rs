//! Daily directory sync: guild channels and members into each region's store.

use backblast_core::{DirectorySource, DirectoryStore, RegionConfig, Result};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{error, info};

pub struct DirectorySync {
    source: Arc<dyn DirectorySource>,
    store: Arc<dyn DirectoryStore>,
}

/// Regions synced and regions that failed in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub failed: usize,
}

impl DirectorySync {
    pub fn new(source: Arc<dyn DirectorySource>, store: Arc<dyn DirectoryStore>) -> Self {
        Self { source, store }
    }

    /// Syncs every region; a failing region does not stop the others.
    pub async fn sync_all(&self, regions: &[RegionConfig]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for region in regions {
            match self.sync_region(region).await {
                Ok(()) => summary.synced += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(region = %region.name, error = %e, "Directory sync failed");
                }
            }
        }
        summary
    }

    pub async fn sync_region(&self, region: &RegionConfig) -> Result<()> {
        let channels = self.source.guild_channels(region.guild_id).await?;
        let users = self.source.guild_members(region.guild_id).await?;

        self.store
            .store_directory(&region.namespace, &channels, &users)
            .await?;

        metrics().directory_syncs.inc();
        info!(
            region = %region.name,
            channels = channels.len(),
            users = users.len(),
            "Directory synced"
        );
        Ok(())
    }
}
