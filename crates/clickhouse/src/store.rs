//! Collaborator trait implementations backed by ClickHouse.

use crate::client::ClickHouseClient;
use crate::{insert, query};
use async_trait::async_trait;
use backblast_core::{
    AoMonthlySummary, AttendanceStore, BackblastRecord, ChannelCheckpoint, CheckpointStore,
    DirectoryChannel, DirectoryStore, DirectoryUser, ReportStore, Result,
};

/// ClickHouse-backed attendance, checkpoint, directory and report store.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

#[async_trait]
impl AttendanceStore for ClickHouseStore {
    async fn upsert_record(&self, namespace: &str, record: &BackblastRecord) -> Result<()> {
        insert::upsert_beatdown(&self.client, namespace, record).await
    }
}

#[async_trait]
impl CheckpointStore for ClickHouseStore {
    async fn load_checkpoints(&self) -> Result<Vec<ChannelCheckpoint>> {
        query::load_checkpoints(&self.client).await
    }

    async fn save_checkpoint(&self, checkpoint: &ChannelCheckpoint) -> Result<()> {
        insert::save_checkpoint(&self.client, checkpoint).await
    }
}

#[async_trait]
impl DirectoryStore for ClickHouseStore {
    async fn store_directory(
        &self,
        namespace: &str,
        channels: &[DirectoryChannel],
        users: &[DirectoryUser],
    ) -> Result<()> {
        insert::insert_directory(&self.client, namespace, channels, users).await
    }
}

#[async_trait]
impl ReportStore for ClickHouseStore {
    async fn monthly_summary(
        &self,
        namespace: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<AoMonthlySummary>> {
        query::monthly_summary(&self.client, namespace, year, month).await
    }
}
