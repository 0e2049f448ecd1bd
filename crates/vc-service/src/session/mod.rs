//! Session model.
//!
//! A [`Session`] tracks one continuous occupancy of an anchor room: when it
//! started, who started it, every participant's accumulated presence and
//! the team sub-rooms split off from it. Sessions are owned by the
//! [`SessionStore`] inside the lifecycle actor; other tasks only ever see
//! [`SessionSnapshot`] copies.

pub mod presence;
pub mod store;
pub mod teams;

pub use presence::ParticipantRecord;
pub use store::{ProvisionedRooms, SessionStore};
pub use teams::{PanelAction, TeamLabel};

use crate::collaborators::{MemberHandle, RoomHandle};
use chrono::{DateTime, Utc};
use common::types::{GuildId, MemberId, MessageRef, RoomId};
use presence::elapsed_seconds;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One active lifecycle session, keyed by its anchor room.
#[derive(Debug, Clone)]
pub struct Session {
    pub room_id: RoomId,
    pub guild_id: GuildId,
    /// Anchor room name at session start; team rooms are named after it.
    pub room_name: String,
    pub started_at: DateTime<Utc>,
    pub starter_id: MemberId,
    pub participants: HashMap<MemberId, ParticipantRecord>,
    /// Team sub-rooms. Mutated only through [`SessionStore`] so the reverse
    /// index stays in sync.
    pub(crate) team_rooms: BTreeMap<TeamLabel, RoomId>,
    /// Session-start notice in the notice channel.
    pub notice_message: Option<MessageRef>,
    /// Current team panel posted in the anchor room.
    pub(crate) panel_message: Option<MessageRef>,
}

impl Session {
    #[must_use]
    pub fn new(room: &RoomHandle, starter: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            room_id: room.id,
            guild_id: room.guild_id,
            room_name: room.name.clone(),
            started_at: now,
            starter_id: starter,
            participants: HashMap::new(),
            team_rooms: BTreeMap::new(),
            notice_message: None,
            panel_message: None,
        }
    }

    /// Register a member as connected.
    ///
    /// New members get a fresh record; returning members keep their total
    /// and only open a new interval if none is open. The display name is
    /// refreshed either way. Returns `true` if an interval was opened.
    pub fn register(&mut self, member: &MemberHandle, now: DateTime<Utc>) -> bool {
        match self.participants.get_mut(&member.id) {
            Some(record) => {
                record.display_name.clone_from(&member.display_name);
                record.mark_joined(now)
            }
            None => {
                self.participants.insert(
                    member.id,
                    ParticipantRecord::connected(member.display_name.clone(), now),
                );
                true
            }
        }
    }

    /// Close a member's open interval. Returns the seconds added, or `None`
    /// if the member never participated.
    pub fn finalize(
        &mut self,
        member: MemberId,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        let record = self.participants.get_mut(&member)?;
        record.display_name = display_name.to_string();
        Some(record.finalize(now))
    }

    /// Close every open interval (session termination).
    pub fn finalize_all(&mut self, now: DateTime<Utc>) {
        for record in self.participants.values_mut() {
            record.finalize(now);
        }
    }

    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.participants
            .values()
            .filter(|p| p.is_connected())
            .count()
    }

    /// Anchor room followed by every team room.
    #[must_use]
    pub fn room_ids(&self) -> Vec<RoomId> {
        std::iter::once(self.room_id)
            .chain(self.team_rooms.values().copied())
            .collect()
    }

    #[must_use]
    pub fn team_rooms(&self) -> &BTreeMap<TeamLabel, RoomId> {
        &self.team_rooms
    }

    #[must_use]
    pub fn panel_message(&self) -> Option<MessageRef> {
        self.panel_message
    }

    /// History row for a session ending at `ended_at`.
    ///
    /// Call after [`Session::finalize_all`]; open intervals are not counted.
    #[must_use]
    pub fn to_record(&self, ended_at: DateTime<Utc>) -> SessionRecord {
        let participants = self
            .participants
            .iter()
            .map(|(id, p)| {
                (
                    *id,
                    ParticipantSummary {
                        name: p.display_name.clone(),
                        total_seconds: p.total_seconds,
                    },
                )
            })
            .collect();

        SessionRecord {
            guild_id: self.guild_id,
            room_id: self.room_id,
            room_name: self.room_name.clone(),
            started_at: self.started_at,
            ended_at,
            duration_seconds: elapsed_seconds(self.started_at, ended_at),
            participants,
        }
    }

    /// Read model with live totals as of `now`.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let mut participants: Vec<ParticipantSnapshot> = self
            .participants
            .iter()
            .map(|(id, p)| ParticipantSnapshot {
                member_id: *id,
                name: p.display_name.clone(),
                total_seconds: p.live_total(now),
                connected: p.is_connected(),
                team: p.team,
            })
            .collect();
        participants.sort_by(|a, b| {
            b.total_seconds
                .cmp(&a.total_seconds)
                .then(a.member_id.cmp(&b.member_id))
        });

        SessionSnapshot {
            room_id: self.room_id,
            guild_id: self.guild_id,
            room_name: self.room_name.clone(),
            started_at: self.started_at,
            starter_id: self.starter_id,
            elapsed_seconds: elapsed_seconds(self.started_at, now),
            team_rooms: self.team_rooms.clone(),
            participants,
        }
    }
}

/// Per-participant totals in a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub name: String,
    #[serde(rename = "total_sec")]
    pub total_seconds: i64,
}

/// Archived form of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub guild_id: GuildId,
    pub room_id: RoomId,
    pub room_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub participants: BTreeMap<MemberId, ParticipantSummary>,
}

/// Point-in-time view of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantSnapshot {
    pub member_id: MemberId,
    pub name: String,
    pub total_seconds: i64,
    pub connected: bool,
    pub team: Option<TeamLabel>,
}

/// Point-in-time view of an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub room_id: RoomId,
    pub guild_id: GuildId,
    pub room_name: String,
    pub started_at: DateTime<Utc>,
    pub starter_id: MemberId,
    pub elapsed_seconds: i64,
    pub team_rooms: BTreeMap<TeamLabel, RoomId>,
    pub participants: Vec<ParticipantSnapshot>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn participant(&self, member: MemberId) -> Option<&ParticipantSnapshot> {
        self.participants.iter().find(|p| p.member_id == member)
    }
}
