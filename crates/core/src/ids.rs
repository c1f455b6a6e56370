//! Discord snowflake identifiers.
//!
//! Each id is a thin newtype over `u64` so a user id can never be passed
//! where a channel id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

snowflake_id!(
    /// A chat user (also used for the Q, Co-Q and PAX).
    UserId
);

snowflake_id!(
    /// A chat channel. AOs are modeled as channels.
    ChannelId
);

snowflake_id!(
    /// A single chat message; the idempotency key for stored backblasts.
    MessageId
);

snowflake_id!(
    /// A guild (community). Each region maps to one guild.
    GuildId
);
