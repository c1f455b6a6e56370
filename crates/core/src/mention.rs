//! Mention token resolution.
//!
//! A user mention appears in message text either in the direct form
//! `<@id>` or the nickname form `<@!id>`. Channels appear as `<#id>`.

use regex::Regex;
use std::sync::LazyLock;

use crate::ids::{ChannelId, UserId};

/// A whole value that is exactly one channel mention.
static CHANNEL_MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d+)>$").expect("invalid channel mention pattern"));

/// Direct mention token for a user.
pub fn direct_token(user: UserId) -> String {
    format!("<@{user}>")
}

/// Nickname mention token for a user.
pub fn nickname_token(user: UserId) -> String {
    format!("<@!{user}>")
}

/// Returns the users from `mentions` whose token appears in `fragment`.
///
/// The result keeps the order of `mentions`, not the order tokens appear in
/// the fragment. The same user may resolve in several fragments of one
/// message; callers must not deduplicate across fields.
pub fn resolve_mentions(fragment: &str, mentions: &[UserId]) -> Vec<UserId> {
    mentions
        .iter()
        .copied()
        .filter(|user| {
            fragment.contains(&direct_token(*user)) || fragment.contains(&nickname_token(*user))
        })
        .collect()
}

/// Extracts the channel id from a value that is exactly `<#id>`.
pub fn parse_channel_mention(value: &str) -> Option<ChannelId> {
    CHANNEL_MENTION_REGEX
        .captures(value.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
}
