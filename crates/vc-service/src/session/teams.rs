//! Team labels and team sub-room sizing.
//!
//! A session can split its anchor room into up to four team sub-rooms.
//! Labels form a closed set so a panel reaction or command argument that
//! names anything else is rejected instead of creating a stray room.

use crate::collaborators::{RoomHandle, RoomSpec};
use crate::errors::LifecycleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Panel reaction that splits members into their team rooms.
pub const SPLIT_EMOJI: &str = "\u{1F500}";

/// Panel reaction that gathers everyone back into the anchor room.
pub const GATHER_EMOJI: &str = "\u{1F3E0}";

/// Team label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamLabel {
    A,
    B,
    C,
    D,
}

impl TeamLabel {
    /// All labels in panel order.
    pub const ALL: [TeamLabel; 4] = [TeamLabel::A, TeamLabel::B, TeamLabel::C, TeamLabel::D];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TeamLabel::A => "A",
            TeamLabel::B => "B",
            TeamLabel::C => "C",
            TeamLabel::D => "D",
        }
    }

    /// Regional indicator emoji used as the panel reaction for this team.
    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self {
            TeamLabel::A => "\u{1F1E6}",
            TeamLabel::B => "\u{1F1E7}",
            TeamLabel::C => "\u{1F1E8}",
            TeamLabel::D => "\u{1F1E9}",
        }
    }

    #[must_use]
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.emoji() == emoji)
    }
}

impl fmt::Display for TeamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamLabel {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(TeamLabel::A),
            "B" => Ok(TeamLabel::B),
            "C" => Ok(TeamLabel::C),
            "D" => Ok(TeamLabel::D),
            _ => Err(LifecycleError::UnknownTeam(s.to_string())),
        }
    }
}

/// Action requested through a team panel reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    Assign(TeamLabel),
    Split,
    Gather,
}

impl PanelAction {
    #[must_use]
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji {
            SPLIT_EMOJI => Some(PanelAction::Split),
            GATHER_EMOJI => Some(PanelAction::Gather),
            other => TeamLabel::from_emoji(other).map(PanelAction::Assign),
        }
    }
}

/// Deterministic name of a team sub-room.
#[must_use]
pub fn team_room_name(anchor_name: &str, label: TeamLabel) -> String {
    format!("{anchor_name}-{label}")
}

/// Creation parameters for a team sub-room.
///
/// The sub-room lives in the anchor's category, mirrors its member cap and
/// uses the anchor bitrate clamped to what the guild currently allows.
#[must_use]
pub fn team_room_spec(anchor: &RoomHandle, label: TeamLabel, guild_bitrate_limit: u32) -> RoomSpec {
    RoomSpec {
        guild_id: anchor.guild_id,
        name: team_room_name(&anchor.name, label),
        category: anchor.category,
        capacity: anchor.capacity,
        bitrate: anchor.bitrate.min(guild_bitrate_limit),
    }
}
