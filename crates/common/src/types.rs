//! Platform identifier types.
//!
//! The chat platform hands out 64-bit snowflake ids for guilds, channels,
//! members and messages. Each kind gets its own newtype so a member id can
//! never be passed where a room id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw snowflake.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw snowflake value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

snowflake_id!(
    /// Identifier of a guild (server).
    GuildId
);

snowflake_id!(
    /// Identifier of a voice room. Voice rooms double as the text chat the
    /// join/leave notices are posted into.
    RoomId
);

snowflake_id!(
    /// Identifier of a channel category.
    CategoryId
);

snowflake_id!(
    /// Identifier of a guild member.
    MemberId
);

/// Opaque handle to a message the service posted, kept only so it can be
/// deleted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Channel the message lives in.
    pub channel_id: u64,
    /// Message id within that channel.
    pub message_id: u64,
}

impl MessageRef {
    #[must_use]
    pub const fn new(channel_id: u64, message_id: u64) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}
