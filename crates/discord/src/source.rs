//! Collaborator trait implementations over the Discord REST API.

use async_trait::async_trait;
use backblast_core::limits::MAX_HISTORY_REQUEST;
use backblast_core::{
    ChannelDirectory, ChannelId, ChatMessage, DirectoryChannel, DirectorySource, DirectoryUser,
    GuildId, MessageId, MessageSource, ReplySink, Result,
};
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::client::{error_for_status, DiscordClient};
use crate::models::{ApiChannel, ApiMember, ApiMessage, CreateMessage, GUILD_TEXT};
use crate::snowflake::snowflake_after;

/// Guild members returned per request (platform maximum).
const MEMBER_PAGE_LIMIT: usize = 1000;

#[async_trait]
impl ChannelDirectory for DiscordClient {
    async fn channel_exists(&self, channel: ChannelId) -> Result<bool> {
        if let Some(known) = self.channel_cache().get(&channel).await {
            return Ok(known);
        }

        let path = format!("/channels/{}", channel);
        let response = self.execute(|| self.request(Method::GET, &path)).await?;
        let exists = match response.status() {
            // Forbidden means the bot cannot see it, which is as good as unknown.
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => false,
            _ => {
                error_for_status(&path, response).await?;
                true
            }
        };

        debug!(channel_id = %channel, exists = exists, "Channel lookup");
        self.channel_cache().insert(channel, exists).await;
        Ok(exists)
    }
}

#[async_trait]
impl MessageSource for DiscordClient {
    async fn fetch_history(
        &self,
        channel: ChannelId,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let path = format!("/channels/{}/messages", channel);
        let mut after_id = snowflake_after(after);
        let mut messages = Vec::new();

        while messages.len() < limit {
            let page_limit = (limit - messages.len()).min(MAX_HISTORY_REQUEST);
            let mut page: Vec<ApiMessage> = self
                .get_json(
                    &path,
                    &[
                        ("after", after_id.to_string()),
                        ("limit", page_limit.to_string()),
                    ],
                )
                .await?;

            // Pages are not guaranteed to be oldest-first.
            page.sort_by_key(|m| m.id);
            let full_page = page.len() >= page_limit;
            match page.last() {
                Some(last) => after_id = last.id.get(),
                None => break,
            }
            messages.extend(page.into_iter().map(ChatMessage::from));
            if !full_page {
                break;
            }
        }

        messages.truncate(limit);
        debug!(channel_id = %channel, count = messages.len(), "Fetched history");
        Ok(messages)
    }
}

#[async_trait]
impl ReplySink for DiscordClient {
    async fn reply(&self, channel: ChannelId, message: MessageId, text: &str) -> Result<()> {
        let path = format!("/channels/{}/messages", channel);
        let body = CreateMessage::reply(text, message);
        let response = self
            .execute(|| self.request(Method::POST, &path).json(&body))
            .await?;
        error_for_status(&path, response).await?;
        Ok(())
    }

    async fn post(&self, channel: ChannelId, text: &str) -> Result<()> {
        let path = format!("/channels/{}/messages", channel);
        let body = CreateMessage::post(text);
        let response = self
            .execute(|| self.request(Method::POST, &path).json(&body))
            .await?;
        error_for_status(&path, response).await?;
        Ok(())
    }
}

#[async_trait]
impl DirectorySource for DiscordClient {
    /// Text channels of a guild. Also primes the channel-existence cache.
    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<DirectoryChannel>> {
        let channels: Vec<ApiChannel> = self
            .get_json(&format!("/guilds/{}/channels", guild), &[])
            .await?;

        let mut text_channels = Vec::new();
        for channel in channels {
            self.channel_cache().insert(channel.id, true).await;
            if channel.kind == GUILD_TEXT {
                text_channels.push(DirectoryChannel::from(channel));
            }
        }
        Ok(text_channels)
    }

    async fn guild_members(&self, guild: GuildId) -> Result<Vec<DirectoryUser>> {
        let path = format!("/guilds/{}/members", guild);
        let mut after = 0u64;
        let mut users = Vec::new();

        loop {
            let page: Vec<ApiMember> = self
                .get_json(
                    &path,
                    &[
                        ("limit", MEMBER_PAGE_LIMIT.to_string()),
                        ("after", after.to_string()),
                    ],
                )
                .await?;
            let full_page = page.len() >= MEMBER_PAGE_LIMIT;
            match page.iter().map(|m| m.user.id.get()).max() {
                Some(highest) => after = highest,
                None => break,
            }
            users.extend(page.into_iter().map(DirectoryUser::from));
            if !full_page {
                break;
            }
        }

        debug!(guild_id = %guild, count = users.len(), "Fetched guild members");
        Ok(users)
    }
}
