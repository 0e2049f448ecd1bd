//! In-memory session bookkeeping.
//!
//! [`SessionStore`] is owned by the lifecycle actor and is never shared, so
//! it needs no locking. [`ProvisionedRooms`] is shared with the deletion
//! scheduler and guarded by a `tokio::sync::RwLock`.

use super::teams::TeamLabel;
use super::Session;
use common::types::{MessageRef, RoomId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Active sessions keyed by anchor room, plus reverse indexes for team
/// rooms and team panels.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<RoomId, Session>,
    /// team room -> anchor room
    team_index: HashMap<RoomId, RoomId>,
    /// panel message -> anchor room
    panel_index: HashMap<MessageRef, RoomId>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session. Returns `false` (and leaves the store as it
    /// was) if the anchor already has one.
    pub fn insert(&mut self, session: Session) -> bool {
        if self.sessions.contains_key(&session.room_id) {
            return false;
        }
        for room in session.team_rooms.values() {
            self.team_index.insert(*room, session.room_id);
        }
        if let Some(panel) = session.panel_message {
            self.panel_index.insert(panel, session.room_id);
        }
        self.sessions.insert(session.room_id, session);
        true
    }

    /// Remove a session and every index entry pointing at it.
    pub fn remove(&mut self, anchor: RoomId) -> Option<Session> {
        let session = self.sessions.remove(&anchor)?;
        self.team_index.retain(|_, a| *a != anchor);
        self.panel_index.retain(|_, a| *a != anchor);
        Some(session)
    }

    #[must_use]
    pub fn get(&self, anchor: RoomId) -> Option<&Session> {
        self.sessions.get(&anchor)
    }

    pub fn get_mut(&mut self, anchor: RoomId) -> Option<&mut Session> {
        self.sessions.get_mut(&anchor)
    }

    /// Anchor of the session `room` belongs to, either as anchor or as one
    /// of its team rooms.
    #[must_use]
    pub fn anchor_for(&self, room: RoomId) -> Option<RoomId> {
        if self.sessions.contains_key(&room) {
            return Some(room);
        }
        self.team_index.get(&room).copied()
    }

    /// Record a team room for a session. Returns the previously bound room
    /// for that label, if any.
    pub fn bind_team_room(
        &mut self,
        anchor: RoomId,
        label: TeamLabel,
        room: RoomId,
    ) -> Option<RoomId> {
        let session = self.sessions.get_mut(&anchor)?;
        let previous = session.team_rooms.insert(label, room);
        if let Some(old) = previous {
            self.team_index.remove(&old);
        }
        self.team_index.insert(room, anchor);
        previous
    }

    /// Forget every team room of a session, returning them.
    pub fn unbind_team_rooms(&mut self, anchor: RoomId) -> BTreeMap<TeamLabel, RoomId> {
        let Some(session) = self.sessions.get_mut(&anchor) else {
            return BTreeMap::new();
        };
        let rooms = std::mem::take(&mut session.team_rooms);
        for room in rooms.values() {
            self.team_index.remove(room);
        }
        rooms
    }

    /// Replace the team panel of a session. Returns the old panel.
    pub fn set_panel(&mut self, anchor: RoomId, panel: Option<MessageRef>) -> Option<MessageRef> {
        let session = self.sessions.get_mut(&anchor)?;
        let previous = std::mem::replace(&mut session.panel_message, panel);
        if let Some(old) = previous {
            self.panel_index.remove(&old);
        }
        if let Some(new) = panel {
            self.panel_index.insert(new, anchor);
        }
        previous
    }

    #[must_use]
    pub fn anchor_for_panel(&self, panel: MessageRef) -> Option<RoomId> {
        self.panel_index.get(&panel).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Rooms this process created (personal rooms and team rooms).
///
/// Cheap to clone; all clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ProvisionedRooms {
    rooms: Arc<RwLock<HashSet<RoomId>>>,
}

impl ProvisionedRooms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, room: RoomId) -> bool {
        self.rooms.write().await.insert(room)
    }

    pub async fn remove(&self, room: RoomId) -> bool {
        self.rooms.write().await.remove(&room)
    }

    pub async fn contains(&self, room: RoomId) -> bool {
        self.rooms.read().await.contains(&room)
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::collaborators::RoomHandle;
    use chrono::Utc;
    use common::types::{GuildId, MemberId};

    fn session(anchor: u64) -> Session {
        let room = RoomHandle {
            id: RoomId(anchor),
            guild_id: GuildId(1),
            name: format!("room-{anchor}"),
            category: None,
            capacity: 0,
            bitrate: 64_000,
        };
        Session::new(&room, MemberId(1), Utc::now())
    }

    #[test]
    fn test_insert_rejects_duplicate_anchor() {
        let mut store = SessionStore::new();

        assert!(store.insert(session(10)));
        assert!(!store.insert(session(10)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_team_rooms_resolve_to_anchor() {
        let mut store = SessionStore::new();
        store.insert(session(10));

        store.bind_team_room(RoomId(10), TeamLabel::A, RoomId(11));
        store.bind_team_room(RoomId(10), TeamLabel::B, RoomId(12));

        assert_eq!(store.anchor_for(RoomId(10)), Some(RoomId(10)));
        assert_eq!(store.anchor_for(RoomId(11)), Some(RoomId(10)));
        assert_eq!(store.anchor_for(RoomId(12)), Some(RoomId(10)));
        assert_eq!(store.anchor_for(RoomId(99)), None);
        assert_eq!(
            store.get(RoomId(10)).unwrap().room_ids(),
            vec![RoomId(10), RoomId(11), RoomId(12)]
        );
    }

    #[test]
    fn test_rebinding_a_label_drops_stale_room() {
        let mut store = SessionStore::new();
        store.insert(session(10));

        store.bind_team_room(RoomId(10), TeamLabel::A, RoomId(11));
        let previous = store.bind_team_room(RoomId(10), TeamLabel::A, RoomId(21));

        assert_eq!(previous, Some(RoomId(11)));
        assert_eq!(store.anchor_for(RoomId(11)), None);
        assert_eq!(store.anchor_for(RoomId(21)), Some(RoomId(10)));
    }

    #[test]
    fn test_bind_without_session_is_ignored() {
        let mut store = SessionStore::new();
        assert_eq!(store.bind_team_room(RoomId(10), TeamLabel::A, RoomId(11)), None);
        assert_eq!(store.anchor_for(RoomId(11)), None);
    }

    #[test]
    fn test_unbind_clears_reverse_index() {
        let mut store = SessionStore::new();
        store.insert(session(10));
        store.bind_team_room(RoomId(10), TeamLabel::A, RoomId(11));

        let rooms = store.unbind_team_rooms(RoomId(10));

        assert_eq!(rooms.get(&TeamLabel::A), Some(&RoomId(11)));
        assert_eq!(store.anchor_for(RoomId(11)), None);
        assert!(store.get(RoomId(10)).unwrap().team_rooms().is_empty());
    }

    #[test]
    fn test_remove_clears_all_indexes() {
        let mut store = SessionStore::new();
        store.insert(session(10));
        store.bind_team_room(RoomId(10), TeamLabel::C, RoomId(13));
        let panel = MessageRef::new(10, 500);
        store.set_panel(RoomId(10), Some(panel));

        let removed = store.remove(RoomId(10)).unwrap();

        assert_eq!(removed.panel_message(), Some(panel));
        assert!(store.is_empty());
        assert_eq!(store.anchor_for(RoomId(13)), None);
        assert_eq!(store.anchor_for_panel(panel), None);
    }

    #[test]
    fn test_set_panel_replaces_previous() {
        let mut store = SessionStore::new();
        store.insert(session(10));

        let first = MessageRef::new(10, 1);
        let second = MessageRef::new(10, 2);
        assert_eq!(store.set_panel(RoomId(10), Some(first)), None);
        assert_eq!(store.set_panel(RoomId(10), Some(second)), Some(first));

        assert_eq!(store.anchor_for_panel(first), None);
        assert_eq!(store.anchor_for_panel(second), Some(RoomId(10)));
    }

    #[tokio::test]
    async fn test_provisioned_rooms_are_shared_between_clones() {
        let rooms = ProvisionedRooms::new();
        let clone = rooms.clone();

        assert!(rooms.insert(RoomId(5)).await);
        assert!(!clone.insert(RoomId(5)).await);
        assert!(clone.contains(RoomId(5)).await);

        assert!(clone.remove(RoomId(5)).await);
        assert_eq!(rooms.len().await, 0);
    }
}
