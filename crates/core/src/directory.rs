//! Guild directory snapshots refreshed by the daily sync.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, UserId};

/// A channel known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryChannel {
    pub id: ChannelId,
    pub name: String,
}

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub username: String,
    /// Guild nickname or global display name, if set
    pub display_name: Option<String>,
    pub is_bot: bool,
}
