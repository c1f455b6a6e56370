//! Discord REST payloads.
//!
//! Only the fields the miner reads are modeled. Snowflakes arrive as JSON
//! strings and are parsed into typed ids on deserialization.

use backblast_core::{
    ChannelId, ChatMessage, DirectoryChannel, DirectoryUser, MessageId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Guild text channel type.
pub const GUILD_TEXT: u8 = 0;

fn de_snowflake<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// A user object.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    #[serde(deserialize_with = "de_snowflake")]
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: Option<bool>,
}

/// A message object.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(deserialize_with = "de_snowflake")]
    pub id: MessageId,
    #[serde(deserialize_with = "de_snowflake")]
    pub channel_id: ChannelId,
    pub author: ApiUser,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mentions: Vec<ApiUser>,
    /// Present when a webhook posted the message
    #[serde(default)]
    pub webhook_id: Option<String>,
}

impl From<ApiMessage> for ChatMessage {
    fn from(message: ApiMessage) -> Self {
        let author_is_bot = message.author.bot.unwrap_or(false) || message.webhook_id.is_some();
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author.id,
            author_is_bot,
            content: message.content,
            timestamp: message.timestamp,
            mentions: message.mentions.into_iter().map(|u| u.id).collect(),
        }
    }
}

/// A channel object.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiChannel {
    #[serde(deserialize_with = "de_snowflake")]
    pub id: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: u8,
}

impl From<ApiChannel> for DirectoryChannel {
    fn from(channel: ApiChannel) -> Self {
        Self {
            id: channel.id,
            name: channel.name.unwrap_or_default(),
        }
    }
}

/// A guild member object.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMember {
    pub user: ApiUser,
    #[serde(default)]
    pub nick: Option<String>,
}

impl From<ApiMember> for DirectoryUser {
    fn from(member: ApiMember) -> Self {
        Self {
            id: member.user.id,
            display_name: member.nick.or(member.user.global_name),
            is_bot: member.user.bot.unwrap_or(false),
            username: member.user.username,
        }
    }
}

/// Body of a 429 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimited {
    /// Seconds to wait before retrying
    pub retry_after: f64,
}

/// Reference to the message being replied to.
#[derive(Debug, Clone, Serialize)]
pub struct MessageReference {
    pub message_id: String,
    pub fail_if_not_exists: bool,
}

/// Mentions the bot's own posts are allowed to ping.
#[derive(Debug, Clone, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    pub replied_user: bool,
}

/// Body of a create-message request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    pub allowed_mentions: AllowedMentions,
}

impl<'a> CreateMessage<'a> {
    /// A post that pings nobody.
    pub fn post(content: &'a str) -> Self {
        Self {
            content,
            message_reference: None,
            allowed_mentions: AllowedMentions {
                parse: vec![],
                replied_user: false,
            },
        }
    }

    /// A reply that pings only the author of `message`.
    pub fn reply(content: &'a str, message: MessageId) -> Self {
        Self {
            content,
            message_reference: Some(MessageReference {
                message_id: message.to_string(),
                fail_if_not_exists: false,
            }),
            allowed_mentions: AllowedMentions {
                parse: vec![],
                replied_user: true,
            },
        }
    }
}
