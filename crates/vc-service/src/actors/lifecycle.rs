//! Room lifecycle state machine.
//!
//! [`RoomLifecycle`] owns the [`SessionStore`] and turns member enter,
//! leave and move events into session changes plus side-effect requests.
//! It is driven exclusively by the lifecycle actor (see
//! [`super::controller`]), which serializes every call, so no locking is
//! needed here. Collaborator awaits are the only suspension points.
//!
//! # Side-effect failures
//!
//! Notices, message deletions, history writes and team room deletions are
//! best effort: a failure is logged and counted and the state machine
//! carries on as if the side effect had not been requested. Only personal
//! room provisioning and the team panel post return collaborator errors to
//! the caller, because there is nothing to fall back on.

use super::messages::{ControllerStatus, EnterOutcome, LeaveOutcome, MoveOutcome};
use super::metrics::ActorMetrics;
use crate::collaborators::{
    CollaboratorError, Collaborators, MemberHandle, Membership, Notice, NoticeTarget, Requester,
    RoomHandle, TeamOverview,
};
use crate::errors::LifecycleError;
use crate::observability::metrics::{
    record_collaborator_failure, record_notice_sent, record_session_ended,
    record_session_started, record_team_operation, set_sessions_active,
};
use crate::session::teams::team_room_spec;
use crate::session::{ProvisionedRooms, Session, SessionSnapshot, SessionStore, TeamLabel};
use chrono::{DateTime, Utc};
use common::types::{CategoryId, MemberId, MessageRef, RoomId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which rooms the lifecycle engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Entry-point room; joining it provisions a personal room.
    pub base_room: RoomId,
    /// Category whose other rooms are lifecycle-managed.
    pub category: CategoryId,
}

impl LifecycleSettings {
    #[must_use]
    pub fn is_managed(&self, room: &RoomHandle) -> bool {
        room.id != self.base_room && room.category == Some(self.category)
    }
}

/// The lifecycle state machine.
pub struct RoomLifecycle {
    settings: LifecycleSettings,
    store: SessionStore,
    collaborators: Collaborators,
    provisioned: ProvisionedRooms,
    metrics: Arc<ActorMetrics>,
}

impl RoomLifecycle {
    #[must_use]
    pub fn new(
        settings: LifecycleSettings,
        collaborators: Collaborators,
        provisioned: ProvisionedRooms,
        metrics: Arc<ActorMetrics>,
    ) -> Self {
        Self {
            settings,
            store: SessionStore::new(),
            collaborators,
            provisioned,
            metrics,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn membership(&self) -> &dyn Membership {
        self.collaborators.membership.as_ref()
    }

    // ------------------------------------------------------------------
    // Presence events
    // ------------------------------------------------------------------

    /// A member connected to `room`.
    pub async fn on_member_enter(
        &mut self,
        room: RoomId,
        member: &MemberHandle,
        now: DateTime<Utc>,
    ) -> Result<EnterOutcome, LifecycleError> {
        if member.is_bot {
            return Ok(EnterOutcome::Ignored);
        }
        if room == self.settings.base_room {
            return self.provision_personal_room(member).await;
        }

        let Some(handle) = self.membership().room(room) else {
            debug!(
                target: "vc.actor.lifecycle",
                room = %room,
                member = %member.id,
                "Entered room is not in the cache, ignoring"
            );
            return Ok(EnterOutcome::Ignored);
        };

        if let Some(anchor) = self.store.anchor_for(room) {
            self.post(NoticeTarget::Room(room), joined_notice(member))
                .await;
            if let Some(session) = self.store.get_mut(anchor) {
                session.register(member, now);
            }
            debug!(
                target: "vc.actor.lifecycle",
                anchor = %anchor,
                room = %room,
                member = %member.id,
                "Member registered with existing session"
            );
            return Ok(EnterOutcome::Joined { anchor });
        }

        if !self.settings.is_managed(&handle) {
            return Err(LifecycleError::NotManaged(room));
        }

        self.post(NoticeTarget::Room(room), joined_notice(member))
            .await;

        let others: Vec<MemberHandle> = self
            .membership()
            .real_members(room)
            .into_iter()
            .filter(|m| m.id != member.id)
            .collect();

        let mut session = Session::new(&handle, member.id, now);
        session.register(member, now);

        if others.is_empty() {
            let notice = Notice::SessionStarted {
                room_name: handle.name.clone(),
                starter_id: member.id,
                starter_name: member.display_name.clone(),
                started_at: now,
            };
            session.notice_message = self.post(NoticeTarget::NoticeChannel, notice).await;
            self.insert_session(session, "fresh");

            info!(
                target: "vc.actor.lifecycle",
                anchor = %room,
                starter = %member.id,
                "Session started"
            );
            Ok(EnterOutcome::SessionStarted { anchor: room })
        } else {
            for other in &others {
                session.register(other, now);
            }
            self.insert_session(session, "adopted");

            info!(
                target: "vc.actor.lifecycle",
                anchor = %room,
                participants = others.len() + 1,
                "Adopted occupied room without a session"
            );
            Ok(EnterOutcome::Adopted { anchor: room })
        }
    }

    /// A member disconnected from `room`.
    pub async fn on_member_leave(
        &mut self,
        room: RoomId,
        member: &MemberHandle,
        now: DateTime<Utc>,
    ) -> Result<LeaveOutcome, LifecycleError> {
        if member.is_bot || room == self.settings.base_room {
            return Ok(LeaveOutcome::Untracked);
        }

        if self.membership().room(room).is_some() {
            self.post(NoticeTarget::Room(room), left_notice(member))
                .await;
        }

        let anchor = match self.store.anchor_for(room) {
            Some(anchor) => anchor,
            None => match self.stray_session_of(member.id) {
                Some(anchor) => {
                    debug!(
                        target: "vc.actor.lifecycle",
                        anchor = %anchor,
                        room = %room,
                        member = %member.id,
                        "Closing presence left open by an untracked room"
                    );
                    anchor
                }
                None => {
                    debug!(
                        target: "vc.actor.lifecycle",
                        room = %room,
                        member = %member.id,
                        "Leave from room without a session"
                    );
                    return Ok(LeaveOutcome::Untracked);
                }
            },
        };

        if let Some(session) = self.store.get_mut(anchor) {
            if session
                .finalize(member.id, &member.display_name, now)
                .is_none()
            {
                debug!(
                    target: "vc.actor.lifecycle",
                    anchor = %anchor,
                    member = %member.id,
                    "Leaving member was never registered"
                );
            }
        }

        if self.occupancy(anchor) > 0 {
            return Ok(LeaveOutcome::Continued { anchor });
        }

        self.terminate(anchor, now).await;
        Ok(LeaveOutcome::Ended { anchor })
    }

    /// A member moved directly from one room to another.
    ///
    /// Moves between an anchor and its own team rooms keep the open
    /// presence interval; anything else is a leave followed by an enter.
    pub async fn on_member_move(
        &mut self,
        from: RoomId,
        to: RoomId,
        member: &MemberHandle,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, LifecycleError> {
        if !member.is_bot {
            if let (Some(a), Some(b)) = (self.store.anchor_for(from), self.store.anchor_for(to)) {
                if a == b {
                    if self.membership().room(from).is_some() {
                        self.post(NoticeTarget::Room(from), left_notice(member))
                            .await;
                    }
                    self.post(NoticeTarget::Room(to), joined_notice(member))
                        .await;
                    if let Some(session) = self.store.get_mut(a) {
                        session.register(member, now);
                    }
                    return Ok(MoveOutcome::WithinSession { anchor: a });
                }
            }
        }

        let left = self.on_member_leave(from, member, now).await?;
        let entered = self.on_member_enter(to, member, now).await?;
        Ok(MoveOutcome::Crossed { left, entered })
    }

    // ------------------------------------------------------------------
    // Team operations
    // ------------------------------------------------------------------

    /// Assign a member to a team. Creates the session if the room has none.
    pub async fn assign_team(
        &mut self,
        room: RoomId,
        member: MemberId,
        label: TeamLabel,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let Some(handle) = self.present_in(room, member) else {
            record_team_operation("assign", "error");
            return Err(LifecycleError::NotInRoom { member, room });
        };
        let anchor = self.ensure_session(room, member, now)?;

        if let Some(session) = self.store.get_mut(anchor) {
            session.register(&handle, now);
            if let Some(record) = session.participants.get_mut(&member) {
                record.team = Some(label);
            }
        }
        record_team_operation("assign", "success");
        debug!(
            target: "vc.actor.lifecycle",
            anchor = %anchor,
            member = %member,
            team = %label,
            "Team assigned"
        );

        self.refresh_panel(anchor).await;
        Ok(())
    }

    /// Move every assigned member of the anchor room (except the requester)
    /// into their team room. Returns the number of moves requested.
    pub async fn split_teams(
        &mut self,
        room: RoomId,
        requester: Requester,
        now: DateTime<Utc>,
    ) -> Result<usize, LifecycleError> {
        let anchor = self.team_session(room, &requester, now)?;
        let session = self
            .store
            .get(anchor)
            .ok_or(LifecycleError::SessionNotFound(room))?;
        if let Err(e) = authorize(session, &requester, "split") {
            record_team_operation("split", "error");
            return Err(e);
        }

        let anchor_room = self
            .membership()
            .room(anchor)
            .ok_or(LifecycleError::RoomNotFound(anchor))?;
        let bitrate_limit = self.membership().bitrate_limit(anchor_room.guild_id);

        let moves: Vec<(MemberId, TeamLabel)> = self
            .membership()
            .real_members(anchor)
            .into_iter()
            .filter(|m| m.id != requester.id)
            .filter_map(|m| {
                session
                    .participants
                    .get(&m.id)
                    .and_then(|p| p.team)
                    .map(|team| (m.id, team))
            })
            .collect();

        let mut moved = 0;
        for (member, label) in moves {
            let team_room = match self
                .ensure_team_room(anchor, &anchor_room, label, bitrate_limit)
                .await
            {
                Ok(team_room) => team_room,
                Err(e) => {
                    log_failure("create_room", &e);
                    continue;
                }
            };
            match self
                .collaborators
                .provisioning
                .move_member(anchor_room.guild_id, member, team_room)
                .await
            {
                Ok(()) => moved += 1,
                Err(e) => log_failure("move_member", &e),
            }
        }

        record_team_operation("split", "success");
        info!(
            target: "vc.actor.lifecycle",
            anchor = %anchor,
            requester = %requester.id,
            moved,
            "Teams split"
        );

        self.refresh_panel(anchor).await;
        Ok(moved)
    }

    /// Move everyone in the team rooms back to the anchor and delete the
    /// team rooms. Returns the number of moves requested.
    pub async fn gather_teams(
        &mut self,
        room: RoomId,
        requester: Requester,
        now: DateTime<Utc>,
    ) -> Result<usize, LifecycleError> {
        let anchor = self.team_session(room, &requester, now)?;
        let session = self
            .store
            .get(anchor)
            .ok_or(LifecycleError::SessionNotFound(room))?;
        if let Err(e) = authorize(session, &requester, "gather") {
            record_team_operation("gather", "error");
            return Err(e);
        }
        let guild = session.guild_id;

        let team_rooms = self.store.unbind_team_rooms(anchor);
        let mut moved = 0;
        for team_room in team_rooms.values() {
            for member in self.membership().members(*team_room) {
                match self
                    .collaborators
                    .provisioning
                    .move_member(guild, member.id, anchor)
                    .await
                {
                    Ok(()) => moved += 1,
                    Err(e) => log_failure("move_member", &e),
                }
            }
            self.delete_team_room(*team_room).await;
        }

        record_team_operation("gather", "success");
        info!(
            target: "vc.actor.lifecycle",
            anchor = %anchor,
            requester = %requester.id,
            rooms = team_rooms.len(),
            moved,
            "Teams gathered"
        );

        self.refresh_panel(anchor).await;
        Ok(moved)
    }

    /// Post a fresh team panel into the anchor room, replacing any previous
    /// one. Creates the session if the room has none.
    pub async fn post_team_panel(
        &mut self,
        room: RoomId,
        requester: Requester,
        now: DateTime<Utc>,
    ) -> Result<MessageRef, LifecycleError> {
        if self.present_in(room, requester.id).is_none() {
            record_team_operation("panel", "error");
            return Err(LifecycleError::NotInRoom {
                member: requester.id,
                room,
            });
        }
        let anchor = self.ensure_session(room, requester.id, now)?;

        if let Some(old) = self.store.set_panel(anchor, None) {
            self.delete_message(old).await;
        }

        let notice = self
            .team_panel_notice(anchor)
            .ok_or(LifecycleError::SessionNotFound(anchor))?;
        let message = match self
            .collaborators
            .notifier
            .send_notice(NoticeTarget::Room(anchor), notice)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                record_team_operation("panel", "error");
                log_failure("send_notice", &e);
                return Err(e.into());
            }
        };
        record_notice_sent("team_panel");
        self.store.set_panel(anchor, Some(message));
        record_team_operation("panel", "success");

        Ok(message)
    }

    /// Anchor room owning a team panel message.
    #[must_use]
    pub fn room_for_panel(&self, message: MessageRef) -> Option<RoomId> {
        self.store.anchor_for_panel(message)
    }

    // ------------------------------------------------------------------
    // Read operations
    // ------------------------------------------------------------------

    #[must_use]
    pub fn list_sessions(&self, now: DateTime<Utc>) -> Vec<SessionSnapshot> {
        let mut sessions: Vec<SessionSnapshot> =
            self.store.iter().map(|s| s.snapshot(now)).collect();
        sessions.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then(a.room_id.cmp(&b.room_id))
        });
        sessions
    }

    /// Snapshot of the session `room` belongs to (anchor or team room).
    pub fn session_snapshot(
        &self,
        room: RoomId,
        now: DateTime<Utc>,
    ) -> Result<SessionSnapshot, LifecycleError> {
        self.store
            .anchor_for(room)
            .and_then(|anchor| self.store.get(anchor))
            .map(|s| s.snapshot(now))
            .ok_or(LifecycleError::SessionNotFound(room))
    }

    pub async fn status(&self) -> ControllerStatus {
        ControllerStatus {
            active_sessions: self.store.len(),
            connected_participants: self.store.iter().map(Session::connected_count).sum(),
            provisioned_rooms: self.provisioned.len().await,
            sessions_started: self.metrics.sessions_started(),
            sessions_ended: self.metrics.sessions_ended(),
            messages_processed: 0,
            mailbox_depth: 0,
            mailbox_peak_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn provision_personal_room(
        &self,
        member: &MemberHandle,
    ) -> Result<EnterOutcome, LifecycleError> {
        let base = self
            .membership()
            .room(self.settings.base_room)
            .ok_or(LifecycleError::RoomNotFound(self.settings.base_room))?;

        let provisioned = self
            .collaborators
            .provisioning
            .ensure_personal_room(base.guild_id, member)
            .await?;
        if provisioned.created {
            self.provisioned.insert(provisioned.room).await;
        }

        self.collaborators
            .provisioning
            .move_member(base.guild_id, member.id, provisioned.room)
            .await?;

        info!(
            target: "vc.actor.lifecycle",
            member = %member.id,
            room = %provisioned.room,
            created = provisioned.created,
            "Member sent to personal room"
        );
        Ok(EnterOutcome::Provisioned {
            room: provisioned.room,
            created: provisioned.created,
        })
    }

    /// Return the session for `room`, rebuilding one from live membership
    /// if the room has none.
    fn ensure_session(
        &mut self,
        room: RoomId,
        starter: MemberId,
        now: DateTime<Utc>,
    ) -> Result<RoomId, LifecycleError> {
        if let Some(anchor) = self.store.anchor_for(room) {
            return Ok(anchor);
        }
        let handle = self
            .membership()
            .room(room)
            .ok_or(LifecycleError::RoomNotFound(room))?;
        if !self.settings.is_managed(&handle) {
            return Err(LifecycleError::NotManaged(room));
        }

        let mut session = Session::new(&handle, starter, now);
        for member in self.membership().real_members(room) {
            session.register(&member, now);
        }
        self.insert_session(session, "adopted");
        Ok(room)
    }

    /// Session for a split or gather. A room left without one (after a
    /// restart) is adopted, with the requester as starter when present.
    fn team_session(
        &mut self,
        room: RoomId,
        requester: &Requester,
        now: DateTime<Utc>,
    ) -> Result<RoomId, LifecycleError> {
        if let Some(anchor) = self.store.anchor_for(room) {
            return Ok(anchor);
        }
        let present = self.membership().real_members(room);
        let starter = present
            .iter()
            .find(|m| m.id == requester.id)
            .or_else(|| present.first())
            .map(|m| m.id)
            .ok_or(LifecycleError::SessionNotFound(room))?;
        self.ensure_session(room, starter, now)
    }

    fn insert_session(&mut self, session: Session, origin: &'static str) {
        if self.store.insert(session) {
            self.metrics.session_started();
            record_session_started(origin);
            set_sessions_active(self.store.len());
        }
    }

    /// Real members across the anchor and its team rooms.
    fn occupancy(&self, anchor: RoomId) -> usize {
        self.session_rooms(anchor)
            .into_iter()
            .map(|room| self.membership().real_members(room).len())
            .sum()
    }

    fn session_rooms(&self, anchor: RoomId) -> Vec<RoomId> {
        self.store
            .get(anchor)
            .map_or_else(|| vec![anchor], Session::room_ids)
    }

    /// The member as currently connected to `room`'s session rooms (or to
    /// `room` alone if it has no session).
    fn present_in(&self, room: RoomId, member: MemberId) -> Option<MemberHandle> {
        let rooms = match self.store.anchor_for(room) {
            Some(anchor) => self.session_rooms(anchor),
            None => vec![room],
        };
        rooms
            .into_iter()
            .flat_map(|r| self.membership().real_members(r))
            .find(|m| m.id == member)
    }

    /// Session in which `member` still has an open interval but is no
    /// longer connected to any of its rooms.
    fn stray_session_of(&self, member: MemberId) -> Option<RoomId> {
        self.store
            .iter()
            .filter(|s| {
                s.participants
                    .get(&member)
                    .is_some_and(|p| p.is_connected())
            })
            .map(|s| s.room_id)
            .find(|anchor| {
                !self
                    .session_rooms(*anchor)
                    .into_iter()
                    .any(|r| self.membership().real_members(r).iter().any(|m| m.id == member))
            })
    }

    async fn ensure_team_room(
        &mut self,
        anchor: RoomId,
        anchor_room: &RoomHandle,
        label: TeamLabel,
        bitrate_limit: u32,
    ) -> Result<RoomId, CollaboratorError> {
        let existing = self
            .store
            .get(anchor)
            .and_then(|s| s.team_rooms.get(&label).copied());
        if let Some(existing) = existing {
            if self.membership().room(existing).is_some() {
                return Ok(existing);
            }
        }

        let created = self
            .collaborators
            .provisioning
            .create_room(team_room_spec(anchor_room, label, bitrate_limit))
            .await?;
        self.store.bind_team_room(anchor, label, created.id);
        self.provisioned.insert(created.id).await;

        debug!(
            target: "vc.actor.lifecycle",
            anchor = %anchor,
            team = %label,
            room = %created.id,
            "Team room created"
        );
        Ok(created.id)
    }

    async fn delete_team_room(&self, room: RoomId) {
        if let Err(e) = self.collaborators.provisioning.delete_room(room).await {
            log_failure("delete_room", &e);
        }
        self.provisioned.remove(room).await;
    }

    /// Remove a session and run its end-of-life side effects.
    async fn terminate(&mut self, anchor: RoomId, now: DateTime<Utc>) {
        let Some(mut session) = self.store.remove(anchor) else {
            return;
        };
        session.finalize_all(now);
        self.metrics.session_ended();
        set_sessions_active(self.store.len());

        for message in [session.notice_message.take(), session.panel_message.take()]
            .into_iter()
            .flatten()
        {
            self.delete_message(message).await;
        }

        let record = session.to_record(now);
        record_session_ended(record.duration_seconds);

        let mut participants: Vec<_> = record.participants.values().cloned().collect();
        participants.sort_by(|a, b| {
            b.total_seconds
                .cmp(&a.total_seconds)
                .then_with(|| a.name.cmp(&b.name))
        });
        let summary = Notice::SessionEnded {
            room_name: session.room_name.clone(),
            started_at: session.started_at,
            ended_at: now,
            participants,
        };
        self.post(NoticeTarget::NoticeChannel, summary).await;

        let duration_seconds = record.duration_seconds;
        let participant_count = record.participants.len();
        if let Err(e) = self.collaborators.history.record_session(record).await {
            log_failure("record_session", &e);
        }

        for team_room in session.team_rooms.values() {
            self.delete_team_room(*team_room).await;
        }

        info!(
            target: "vc.actor.lifecycle",
            anchor = %anchor,
            duration_seconds,
            participants = participant_count,
            "Session ended"
        );
    }

    fn team_panel_notice(&self, anchor: RoomId) -> Option<Notice> {
        let session = self.store.get(anchor)?;

        let mut overview = TeamOverview {
            teams: TeamLabel::ALL.iter().map(|l| (*l, Vec::new())).collect(),
            unassigned: Vec::new(),
            starter_name: session
                .participants
                .get(&session.starter_id)
                .map(|p| p.display_name.clone()),
        };

        for member in self
            .session_rooms(anchor)
            .into_iter()
            .flat_map(|r| self.membership().real_members(r))
        {
            let team = session.participants.get(&member.id).and_then(|p| p.team);
            match team.and_then(|t| overview.teams.iter_mut().find(|(l, _)| *l == t)) {
                Some((_, names)) => names.push(member.display_name),
                None => overview.unassigned.push(member.display_name),
            }
        }

        Some(Notice::TeamPanel {
            room_name: session.room_name.clone(),
            overview,
        })
    }

    /// Update the team panel in place if the session has one. The panel
    /// keeps its message id so reactions on it stay routable.
    async fn refresh_panel(&mut self, anchor: RoomId) {
        let Some(panel) = self.store.get(anchor).and_then(Session::panel_message) else {
            return;
        };
        let Some(notice) = self.team_panel_notice(anchor) else {
            return;
        };

        match self
            .collaborators
            .notifier
            .edit_message(panel, notice.clone())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                // Deleted by hand; post a replacement
                log_failure("edit_message", &e);
                let replacement = self.post(NoticeTarget::Room(anchor), notice).await;
                self.store.set_panel(anchor, replacement);
            }
            Err(e) => log_failure("edit_message", &e),
        }
    }

    async fn post(&self, target: NoticeTarget, notice: Notice) -> Option<MessageRef> {
        let kind = notice.kind();
        match self.collaborators.notifier.send_notice(target, notice).await {
            Ok(message) => {
                record_notice_sent(kind);
                Some(message)
            }
            Err(e) => {
                log_failure("send_notice", &e);
                None
            }
        }
    }

    async fn delete_message(&self, message: MessageRef) {
        if let Err(e) = self.collaborators.notifier.delete_message(message).await {
            log_failure("delete_message", &e);
        }
    }
}

fn authorize(
    session: &Session,
    requester: &Requester,
    operation: &str,
) -> Result<(), LifecycleError> {
    if requester.is_admin || requester.id == session.starter_id {
        return Ok(());
    }
    warn!(
        target: "vc.actor.lifecycle",
        anchor = %session.room_id,
        requester = %requester.id,
        operation,
        "Team operation rejected"
    );
    Err(LifecycleError::PermissionDenied(format!(
        "member {} may not {operation} teams in room {}",
        requester.id, session.room_id
    )))
}

fn log_failure(operation: &'static str, error: &CollaboratorError) {
    record_collaborator_failure(operation, error.kind());
    if error.is_not_found() {
        debug!(
            target: "vc.actor.lifecycle",
            operation,
            error = %error,
            "Side effect target already gone"
        );
    } else {
        warn!(
            target: "vc.actor.lifecycle",
            operation,
            error = %error,
            "Side effect failed, continuing"
        );
    }
}

fn joined_notice(member: &MemberHandle) -> Notice {
    Notice::MemberJoined {
        member: member.id,
        display_name: member.display_name.clone(),
    }
}

fn left_notice(member: &MemberHandle) -> Notice {
    Notice::MemberLeft {
        member: member.id,
        display_name: member.display_name.clone(),
    }
}
