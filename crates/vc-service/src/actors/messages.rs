//! Messages for the lifecycle actor.
//!
//! Every request carries a `respond_to` oneshot; the handle awaits it so
//! callers see plain async methods.

use crate::collaborators::{MemberHandle, Requester};
use crate::errors::LifecycleError;
use crate::session::{SessionSnapshot, TeamLabel};
use chrono::{DateTime, Utc};
use common::types::{MemberId, MessageRef, RoomId};
use serde::Serialize;
use tokio::sync::oneshot;

/// Messages handled by the lifecycle actor.
#[derive(Debug)]
pub enum LifecycleMessage {
    MemberEntered {
        room: RoomId,
        member: MemberHandle,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<EnterOutcome, LifecycleError>>,
    },

    MemberLeft {
        room: RoomId,
        member: MemberHandle,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<LeaveOutcome, LifecycleError>>,
    },

    MemberMoved {
        from: RoomId,
        to: RoomId,
        member: MemberHandle,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<MoveOutcome, LifecycleError>>,
    },

    AssignTeam {
        room: RoomId,
        member: MemberId,
        label: TeamLabel,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<(), LifecycleError>>,
    },

    /// Returns the number of moves requested.
    SplitTeams {
        room: RoomId,
        requester: Requester,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<usize, LifecycleError>>,
    },

    /// Returns the number of moves requested.
    GatherTeams {
        room: RoomId,
        requester: Requester,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<usize, LifecycleError>>,
    },

    PostTeamPanel {
        room: RoomId,
        requester: Requester,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<MessageRef, LifecycleError>>,
    },

    /// Anchor room a team panel message belongs to.
    RoomForPanel {
        message: MessageRef,
        respond_to: oneshot::Sender<Option<RoomId>>,
    },

    ListSessions {
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Vec<SessionSnapshot>>,
    },

    GetSession {
        room: RoomId,
        at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<SessionSnapshot, LifecycleError>>,
    },

    GetStatus {
        respond_to: oneshot::Sender<ControllerStatus>,
    },
}

impl LifecycleMessage {
    /// Bounded label for metrics.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            LifecycleMessage::MemberEntered { .. } => "member_entered",
            LifecycleMessage::MemberLeft { .. } => "member_left",
            LifecycleMessage::MemberMoved { .. } => "member_moved",
            LifecycleMessage::AssignTeam { .. } => "assign_team",
            LifecycleMessage::SplitTeams { .. } => "split_teams",
            LifecycleMessage::GatherTeams { .. } => "gather_teams",
            LifecycleMessage::PostTeamPanel { .. } => "post_team_panel",
            LifecycleMessage::RoomForPanel { .. } => "room_for_panel",
            LifecycleMessage::ListSessions { .. } => "list_sessions",
            LifecycleMessage::GetSession { .. } => "get_session",
            LifecycleMessage::GetStatus { .. } => "get_status",
        }
    }
}

/// What a member entering a room resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// Base room entry: member was sent to their personal room.
    Provisioned { room: RoomId, created: bool },
    /// First real member; a new session was started with a notice.
    SessionStarted { anchor: RoomId },
    /// Others were already present without a tracked session (state lost
    /// on restart); the session was rebuilt silently.
    Adopted { anchor: RoomId },
    /// Registered against an existing session.
    Joined { anchor: RoomId },
    /// Bot member or a room that vanished from the cache.
    Ignored,
}

/// What a member leaving a room resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Room has no session.
    Untracked,
    /// Session still has members.
    Continued { anchor: RoomId },
    /// Last member left; the session was terminated.
    Ended { anchor: RoomId },
}

/// What a move between two rooms resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Both rooms belong to the same session; presence is uninterrupted.
    WithinSession { anchor: RoomId },
    /// Rooms belong to different sessions (or none); handled as a leave
    /// followed by an enter.
    Crossed {
        left: LeaveOutcome,
        entered: EnterOutcome,
    },
}

/// Controller status for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub active_sessions: usize,
    pub connected_participants: usize,
    pub provisioned_rooms: usize,
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub messages_processed: u64,
    /// Mailbox depth seen by this request, itself included.
    pub mailbox_depth: usize,
    pub mailbox_peak_depth: usize,
}
