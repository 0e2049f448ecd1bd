//! Narrow interfaces to everything outside the lifecycle engine.
//!
//! The controller and scheduler never touch the chat SDK directly. They see
//! rooms and members through [`RoomHandle`] and [`MemberHandle`] and request
//! side effects through these traits, each returning a [`CollaboratorError`]
//! so every ignored failure is an explicit decision at the call site.
//!
//! Production implementations live in [`crate::discord`] and
//! [`crate::history`]; in-memory mocks live in the `vc-test-utils` crate.

use crate::session::{ParticipantSummary, SessionRecord, TeamLabel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{CategoryId, GuildId, MemberId, MessageRef, RoomId};
use std::sync::Arc;
use thiserror::Error;

/// Read-only view of a voice room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomHandle {
    pub id: RoomId,
    pub guild_id: GuildId,
    pub name: String,
    pub category: Option<CategoryId>,
    /// Member cap; 0 means unlimited.
    pub capacity: u32,
    /// Bitrate in bits per second.
    pub bitrate: u32,
}

/// Read-only view of a guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHandle {
    pub id: MemberId,
    pub display_name: String,
    pub is_bot: bool,
}

/// Member asking for a privileged team operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: MemberId,
    /// Holds the guild administrator permission.
    pub is_admin: bool,
}

/// Parameters for creating a voice room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSpec {
    pub guild_id: GuildId,
    pub name: String,
    pub category: Option<CategoryId>,
    pub capacity: u32,
    pub bitrate: u32,
}

/// Result of personal room provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provisioned {
    pub room: RoomId,
    /// `false` when an existing room with the owner's name was reused.
    pub created: bool,
}

/// Where a notice is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeTarget {
    /// The text chat attached to a voice room.
    Room(RoomId),
    /// The configured session notice channel.
    NoticeChannel,
    /// A direct message to one member.
    DirectMessage(MemberId),
}

/// Team panel contents: current members of each team plus unassigned ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamOverview {
    pub teams: Vec<(TeamLabel, Vec<String>)>,
    pub unassigned: Vec<String>,
    pub starter_name: Option<String>,
}

/// Notice payloads. Rendering is up to the [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MemberJoined {
        member: MemberId,
        display_name: String,
    },
    MemberLeft {
        member: MemberId,
        display_name: String,
    },
    /// The room is empty and will be deleted shortly.
    EmptyWarning,
    SessionStarted {
        room_name: String,
        starter_id: MemberId,
        starter_name: String,
        started_at: DateTime<Utc>,
    },
    SessionEnded {
        room_name: String,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        participants: Vec<ParticipantSummary>,
    },
    TeamPanel {
        room_name: String,
        overview: TeamOverview,
    },
    /// Someone mentioned the recipient in a voice room's chat.
    MentionForward {
        author_name: String,
        room_name: String,
        /// Message text with the mentions stripped; empty if nothing is left.
        excerpt: String,
        jump_url: String,
    },
    /// `@everyone` / `@here` mentions are not forwarded.
    MentionEveryoneWarning,
    /// A mention could not be delivered to `member` by direct message.
    DirectMessageFailed { member: MemberId },
}

impl Notice {
    /// Bounded label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Notice::MemberJoined { .. } => "join",
            Notice::MemberLeft { .. } => "leave",
            Notice::EmptyWarning => "empty_warning",
            Notice::SessionStarted { .. } => "session_start",
            Notice::SessionEnded { .. } => "session_end",
            Notice::TeamPanel { .. } => "team_panel",
            Notice::MentionForward { .. } => "mention_forward",
            Notice::MentionEveryoneWarning => "mention_everyone_warning",
            Notice::DirectMessageFailed { .. } => "direct_message_failed",
        }
    }
}

/// Failure of an external side effect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Target room, member or message no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// The platform refused the request (permissions, limits).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Network or backend failure.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollaboratorError::NotFound(_))
    }

    /// Bounded label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            CollaboratorError::NotFound(_) => "not_found",
            CollaboratorError::Rejected(_) => "rejected",
            CollaboratorError::Unavailable(_) => "unavailable",
        }
    }
}

/// Room creation, deletion and member moves.
#[async_trait]
pub trait ChannelProvisioning: Send + Sync {
    /// Find or create the owner's personal room in the managed category.
    async fn ensure_personal_room(
        &self,
        guild: GuildId,
        owner: &MemberHandle,
    ) -> Result<Provisioned, CollaboratorError>;

    async fn create_room(&self, spec: RoomSpec) -> Result<RoomHandle, CollaboratorError>;

    async fn delete_room(&self, room: RoomId) -> Result<(), CollaboratorError>;

    async fn move_member(
        &self,
        guild: GuildId,
        member: MemberId,
        to: RoomId,
    ) -> Result<(), CollaboratorError>;
}

/// Posting, editing and deleting notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notice(
        &self,
        target: NoticeTarget,
        notice: Notice,
    ) -> Result<MessageRef, CollaboratorError>;

    /// Replace the content of a posted notice, keeping its message id.
    async fn edit_message(
        &self,
        message: MessageRef,
        notice: Notice,
    ) -> Result<(), CollaboratorError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), CollaboratorError>;
}

/// Append-only session history.
#[async_trait]
pub trait HistoryArchive: Send + Sync {
    async fn record_session(&self, record: SessionRecord) -> Result<(), CollaboratorError>;
}

/// Live room membership as seen by the gateway cache.
///
/// Calls are synchronous reads of local state and are always made fresh;
/// callers never cache the answer across an await.
pub trait Membership: Send + Sync {
    fn room(&self, room: RoomId) -> Option<RoomHandle>;

    /// Members currently connected to `room`, bots included.
    fn members(&self, room: RoomId) -> Vec<MemberHandle>;

    /// Highest bitrate the guild's tier allows.
    fn bitrate_limit(&self, guild: GuildId) -> u32;

    /// Non-bot members currently connected to `room`.
    fn real_members(&self, room: RoomId) -> Vec<MemberHandle> {
        self.members(room).into_iter().filter(|m| !m.is_bot).collect()
    }
}

/// The full set of collaborators the lifecycle engine needs.
#[derive(Clone)]
pub struct Collaborators {
    pub provisioning: Arc<dyn ChannelProvisioning>,
    pub notifier: Arc<dyn Notifier>,
    pub history: Arc<dyn HistoryArchive>,
    pub membership: Arc<dyn Membership>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_kinds() {
        assert!(CollaboratorError::NotFound("room".into()).is_not_found());
        assert!(!CollaboratorError::Rejected("perm".into()).is_not_found());
        assert_eq!(CollaboratorError::Unavailable("x".into()).kind(), "unavailable");
    }

    #[test]
    fn test_notice_kinds_are_distinct() {
        let kinds = [
            Notice::EmptyWarning.kind(),
            Notice::MemberJoined {
                member: MemberId(1),
                display_name: String::new(),
            }
            .kind(),
            Notice::TeamPanel {
                room_name: String::new(),
                overview: TeamOverview::default(),
            }
            .kind(),
        ];
        assert_eq!(kinds, ["empty_warning", "join", "team_panel"]);
        assert_eq!(
            Notice::DirectMessageFailed { member: MemberId(3) }.kind(),
            "direct_message_failed"
        );
    }
}
