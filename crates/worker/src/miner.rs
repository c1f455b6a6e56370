//! Channel miner.
//!
//! Scans one channel from its checkpoint: fetch a bounded page of history
//! oldest-first, keep backblast candidates, parse each, upsert successes
//! and reply to failures. Per-message failures never abort the scan; only
//! a failed history fetch fails the channel.

use backblast_core::{
    AttendanceStore, BackblastParser, ChannelCheckpoint, ChannelDirectory, ChatMessage,
    MessageSource, ParseInput, ReplySink, Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, warn};

/// What one channel scan saw and did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub fetched: usize,
    pub candidates: usize,
    pub ingested: usize,
    pub parse_failures: usize,
    pub other_failures: usize,
    /// Latest timestamp among fetched messages, candidates or not
    pub highest_observed: Option<DateTime<Utc>>,
}

/// How a single candidate message ended.
#[derive(Debug)]
enum MessageOutcome {
    Ingested,
    ParseFailed,
    Failed,
}

pub struct ChannelMiner {
    source: Arc<dyn MessageSource>,
    channels: Arc<dyn ChannelDirectory>,
    replies: Arc<dyn ReplySink>,
    store: Arc<dyn AttendanceStore>,
    parser: Arc<BackblastParser>,
    page_size: usize,
}

impl ChannelMiner {
    pub fn new(
        source: Arc<dyn MessageSource>,
        channels: Arc<dyn ChannelDirectory>,
        replies: Arc<dyn ReplySink>,
        store: Arc<dyn AttendanceStore>,
        parser: Arc<BackblastParser>,
        page_size: usize,
    ) -> Self {
        Self {
            source,
            channels,
            replies,
            store,
            parser,
            page_size: page_size.max(1),
        }
    }

    /// Builds a miner whose platform seams are all served by one client.
    pub fn from_platform<P>(
        platform: Arc<P>,
        store: Arc<dyn AttendanceStore>,
        parser: Arc<BackblastParser>,
        page_size: usize,
    ) -> Self
    where
        P: MessageSource + ReplySink + 'static,
    {
        Self::new(
            platform.clone(),
            platform.clone(),
            platform,
            store,
            parser,
            page_size,
        )
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Scans the channel of `checkpoint`, writing records to `namespace`.
    pub async fn scan(&self, namespace: &str, checkpoint: &ChannelCheckpoint) -> Result<ScanOutcome> {
        let start = Instant::now();
        let m = metrics();

        let messages = self
            .source
            .fetch_history(checkpoint.channel_id, checkpoint.last_mined_at, self.page_size)
            .await?;

        let mut outcome = ScanOutcome {
            fetched: messages.len(),
            ..ScanOutcome::default()
        };
        m.messages_scanned.inc_by(messages.len() as u64);

        for message in &messages {
            outcome.highest_observed = outcome.highest_observed.max(Some(message.timestamp));

            if !message.is_backblast_candidate() {
                continue;
            }
            outcome.candidates += 1;
            m.backblast_candidates.inc();

            match self.process(namespace, message).await {
                MessageOutcome::Ingested => outcome.ingested += 1,
                MessageOutcome::ParseFailed => outcome.parse_failures += 1,
                MessageOutcome::Failed => outcome.other_failures += 1,
            }
        }

        m.channel_scan_latency_ms.observe(start.elapsed().as_millis() as u64);
        debug!(
            fetched = outcome.fetched,
            candidates = outcome.candidates,
            ingested = outcome.ingested,
            "Channel scan finished"
        );
        Ok(outcome)
    }

    async fn process(&self, namespace: &str, message: &ChatMessage) -> MessageOutcome {
        match self.ingest(namespace, message).await {
            Ok(()) => {
                debug!(message_id = %message.id, "Ingested backblast");
                MessageOutcome::Ingested
            }
            Err(e) if e.is_parse() => {
                metrics().parse_failures.inc();
                warn!(message_id = %message.id, code = e.error_code(), error = %e, "Backblast rejected");
                self.reply(message, &e.reply_text()).await;
                MessageOutcome::ParseFailed
            }
            Err(e) => {
                metrics().processing_failures.inc();
                error!(message_id = %message.id, error = %e, "Failed to process backblast");
                self.reply(message, &e.reply_text()).await;
                MessageOutcome::Failed
            }
        }
    }

    async fn ingest(&self, namespace: &str, message: &ChatMessage) -> Result<()> {
        let input = ParseInput {
            message_id: message.id,
            text: &message.content,
            mentions: &message.mentions,
        };
        let record = self.parser.parse(input, self.channels.as_ref()).await?;
        self.store.upsert_record(namespace, &record).await
    }

    /// Best-effort reply; delivery failures are only logged.
    async fn reply(&self, message: &ChatMessage, text: &str) {
        match self.replies.reply(message.channel_id, message.id, text).await {
            Ok(()) => metrics().replies_sent.inc(),
            Err(e) => {
                metrics().reply_failures.inc();
                warn!(message_id = %message.id, error = %e, "Failed to deliver reply");
            }
        }
    }
}
