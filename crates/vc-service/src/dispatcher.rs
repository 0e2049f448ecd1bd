//! Voice state event dispatcher.
//!
//! Turns raw before/after voice state changes into lifecycle calls:
//!
//! 1. [`classify`] decides what the change means for managed rooms.
//! 2. Entering a room cancels its pending deletion.
//! 3. The lifecycle controller handles the enter, leave or move.
//! 4. After any leave, the room that may have emptied is handed to the
//!    deletion scheduler.
//!
//! The dispatcher never panics and never returns errors; a controller
//! failure is logged and the event is dropped.

use crate::actors::{
    LeaveOutcome, LifecycleControllerHandle, LifecycleSettings, MoveOutcome,
};
use crate::collaborators::{MemberHandle, Membership};
use crate::observability::metrics::record_voice_event;
use crate::scheduler::DeletionScheduler;
use chrono::{DateTime, Utc};
use common::types::{GuildId, RoomId};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One voice state update from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStateChange {
    pub guild_id: GuildId,
    pub member: MemberHandle,
    /// Room before the update (`None` = was not connected).
    pub before: Option<RoomId>,
    /// Room after the update (`None` = disconnected).
    pub after: Option<RoomId>,
    pub at: DateTime<Utc>,
}

/// What a voice state change means for the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    /// Bot, mute/deafen/stream toggle, or unmanaged rooms only.
    NoOp,
    /// Joined the base room, possibly leaving a managed room.
    EnteredBase { left: Option<RoomId> },
    Entered { room: RoomId },
    Left { room: RoomId },
    Moved { from: RoomId, to: RoomId },
}

impl VoiceTransition {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            VoiceTransition::NoOp => "noop",
            VoiceTransition::EnteredBase { .. } => "entered_base",
            VoiceTransition::Entered { .. } => "entered",
            VoiceTransition::Left { .. } => "left",
            VoiceTransition::Moved { .. } => "moved",
        }
    }
}

/// Classify a voice state change.
///
/// A room is managed if it sits in the configured category and is not the
/// base room. Departures from rooms that are no longer in the cache are
/// still reported, since rooms the service deletes itself vanish before
/// the disconnect event arrives.
#[must_use]
pub fn classify(
    settings: &LifecycleSettings,
    membership: &dyn Membership,
    change: &VoiceStateChange,
) -> VoiceTransition {
    if change.member.is_bot || change.before == change.after {
        return VoiceTransition::NoOp;
    }

    let from = change.before.filter(|room| {
        *room != settings.base_room
            && membership
                .room(*room)
                .map_or(true, |handle| settings.is_managed(&handle))
    });

    if change.after == Some(settings.base_room) {
        return VoiceTransition::EnteredBase { left: from };
    }

    let to = change.after.filter(|room| {
        membership
            .room(*room)
            .is_some_and(|handle| settings.is_managed(&handle))
    });

    match (from, to) {
        (Some(from), Some(to)) => VoiceTransition::Moved { from, to },
        (Some(room), None) => VoiceTransition::Left { room },
        (None, Some(room)) => VoiceTransition::Entered { room },
        (None, None) => VoiceTransition::NoOp,
    }
}

/// Routes voice state changes to the controller and scheduler.
#[derive(Clone)]
pub struct EventDispatcher {
    settings: LifecycleSettings,
    controller: LifecycleControllerHandle,
    scheduler: DeletionScheduler,
    membership: Arc<dyn Membership>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(
        settings: LifecycleSettings,
        controller: LifecycleControllerHandle,
        scheduler: DeletionScheduler,
        membership: Arc<dyn Membership>,
    ) -> Self {
        Self {
            settings,
            controller,
            scheduler,
            membership,
        }
    }

    #[must_use]
    pub fn classify(&self, change: &VoiceStateChange) -> VoiceTransition {
        classify(&self.settings, self.membership.as_ref(), change)
    }

    /// Handle one voice state change end to end.
    #[instrument(skip_all, name = "vc.dispatcher", fields(member = %change.member.id))]
    pub async fn dispatch(&self, change: VoiceStateChange) -> VoiceTransition {
        let transition = self.classify(&change);
        record_voice_event(transition.as_str());

        match transition {
            VoiceTransition::NoOp => {}
            VoiceTransition::EnteredBase { left } => {
                if let Some(room) = left {
                    self.leave(room, &change).await;
                }
                self.enter(self.settings.base_room, &change).await;
            }
            VoiceTransition::Entered { room } => self.enter(room, &change).await,
            VoiceTransition::Left { room } => self.leave(room, &change).await,
            VoiceTransition::Moved { from, to } => {
                self.scheduler.cancel(to).await;
                match self
                    .controller
                    .member_moved(from, to, change.member.clone(), change.at)
                    .await
                {
                    Ok(MoveOutcome::WithinSession { anchor }) => {
                        self.after_leave(from, LeaveOutcome::Continued { anchor })
                            .await;
                    }
                    Ok(MoveOutcome::Crossed { left, entered }) => {
                        debug!(
                            target: "vc.dispatcher",
                            from = %from,
                            to = %to,
                            ?entered,
                            "Move crossed sessions"
                        );
                        self.after_leave(from, left).await;
                    }
                    Err(e) => {
                        warn!(
                            target: "vc.dispatcher",
                            from = %from,
                            to = %to,
                            error = %e,
                            "Failed to handle move"
                        );
                    }
                }
            }
        }

        transition
    }

    async fn enter(&self, room: RoomId, change: &VoiceStateChange) {
        if room != self.settings.base_room {
            self.scheduler.cancel(room).await;
        }
        match self
            .controller
            .member_entered(room, change.member.clone(), change.at)
            .await
        {
            Ok(outcome) => debug!(
                target: "vc.dispatcher",
                room = %room,
                ?outcome,
                "Enter handled"
            ),
            Err(e) => warn!(
                target: "vc.dispatcher",
                room = %room,
                error = %e,
                "Failed to handle enter"
            ),
        }
    }

    async fn leave(&self, room: RoomId, change: &VoiceStateChange) {
        match self
            .controller
            .member_left(room, change.member.clone(), change.at)
            .await
        {
            Ok(outcome) => self.after_leave(room, outcome).await,
            Err(e) => warn!(
                target: "vc.dispatcher",
                room = %room,
                error = %e,
                "Failed to handle leave"
            ),
        }
    }

    /// Schedule deletion of the room a leave may have emptied.
    async fn after_leave(&self, left_room: RoomId, outcome: LeaveOutcome) {
        let candidate = match outcome {
            LeaveOutcome::Ended { anchor } => anchor,
            LeaveOutcome::Continued { anchor } if anchor == left_room => return,
            LeaveOutcome::Continued { .. } | LeaveOutcome::Untracked => left_room,
        };

        if candidate == self.settings.base_room
            || self.membership.room(candidate).is_none()
            || !self.membership.real_members(candidate).is_empty()
        {
            return;
        }

        self.scheduler.schedule(candidate).await;
    }
}
