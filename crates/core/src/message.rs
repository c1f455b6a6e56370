//! Chat messages as seen by the miner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MessageId, UserId};
use crate::limits::BACKBLAST_KEYWORD;

/// A message fetched from a monitored channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    /// Whether the author is an automated account.
    pub author_is_bot: bool,
    /// Raw message text, mention tokens included.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Users mentioned anywhere in the message, in platform order.
    pub mentions: Vec<UserId>,
}

impl ChatMessage {
    /// A message is a backblast candidate when a human wrote it and its text
    /// starts (ignoring leading whitespace and case) with "backblast".
    pub fn is_backblast_candidate(&self) -> bool {
        if self.author_is_bot {
            return false;
        }
        self.content
            .trim_start()
            .get(..BACKBLAST_KEYWORD.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(BACKBLAST_KEYWORD))
    }
}
