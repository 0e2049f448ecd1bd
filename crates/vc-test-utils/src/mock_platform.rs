//! In-memory chat platform for lifecycle testing.
//!
//! Implements all three platform-facing collaborator traits over one shared
//! state:
//! - rooms and who is connected to them ([`Membership`])
//! - room creation, deletion and member moves ([`ChannelProvisioning`])
//! - notices, edits and message deletions ([`Notifier`])
//!
//! Moves and deletions update occupancy immediately, the way the gateway
//! cache would once the platform applied them. They do NOT generate voice
//! state events; tests deliver those explicitly.
//!
//! # Example
//!
//! ```rust,ignore
//! use vc_test_utils::{MockPlatform, MockOperation, CATEGORY, GUILD};
//!
//! let platform = MockPlatform::new(GUILD, CATEGORY);
//! platform.add_room(RoomId(30), "alice\u{306E}VC", Some(CATEGORY));
//! platform.fail(MockOperation::DeleteRoom, CollaboratorError::Unavailable("503".into()));
//! ```

use async_trait::async_trait;
use common::types::{CategoryId, GuildId, MemberId, MessageRef, RoomId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use vc_service::collaborators::{
    ChannelProvisioning, CollaboratorError, Collaborators, HistoryArchive, MemberHandle,
    Membership, Notice, NoticeTarget, Notifier, Provisioned, RoomHandle, RoomSpec,
};
use vc_service::discord::platform::personal_room_name;

/// Channel id reported for notices sent to the notice channel.
pub const NOTICE_CHANNEL: u64 = 900;

/// Direct message channels are reported as this plus the member id.
pub const DM_CHANNEL_BASE: u64 = 1_000_000;

/// First id handed out for created rooms and posted messages.
const FIRST_GENERATED_ID: u64 = 10_000;

const DEFAULT_BITRATE: u32 = 64_000;

/// Collaborator operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    EnsurePersonalRoom,
    CreateRoom,
    DeleteRoom,
    MoveMember,
    SendNotice,
    EditMessage,
    DeleteMessage,
}

/// A notice accepted by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotice {
    pub message: MessageRef,
    pub target: NoticeTarget,
    pub notice: Notice,
}

/// Mock platform. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    inner: Arc<Mutex<PlatformState>>,
}

#[derive(Debug)]
struct PlatformState {
    guild: GuildId,
    category: CategoryId,
    bitrate_limit: u32,
    next_id: u64,
    rooms: HashMap<RoomId, RoomHandle>,
    occupants: HashMap<RoomId, Vec<MemberHandle>>,
    failures: HashMap<MockOperation, CollaboratorError>,
    notices: Vec<SentNotice>,
    edited_messages: Vec<MessageRef>,
    deleted_messages: Vec<MessageRef>,
    dm_blocked: HashSet<MemberId>,
    created_rooms: Vec<RoomHandle>,
    deleted_rooms: Vec<RoomId>,
    moves: Vec<(MemberId, RoomId)>,
}

impl PlatformState {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check(&self, operation: MockOperation) -> Result<(), CollaboratorError> {
        match self.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn detach(&mut self, member: MemberId) -> Option<(RoomId, MemberHandle)> {
        for (room, members) in &mut self.occupants {
            if let Some(index) = members.iter().position(|m| m.id == member) {
                return Some((*room, members.remove(index)));
            }
        }
        None
    }

    fn create(&mut self, spec: RoomSpec) -> RoomHandle {
        let handle = RoomHandle {
            id: RoomId(self.next_id()),
            guild_id: spec.guild_id,
            name: spec.name,
            category: spec.category,
            capacity: spec.capacity,
            bitrate: spec.bitrate,
        };
        self.rooms.insert(handle.id, handle.clone());
        self.created_rooms.push(handle.clone());
        handle
    }
}

impl MockPlatform {
    /// Empty platform for one guild whose managed rooms live in `category`.
    pub fn new(guild: GuildId, category: CategoryId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlatformState {
                guild,
                category,
                bitrate_limit: 96_000,
                next_id: FIRST_GENERATED_ID,
                rooms: HashMap::new(),
                occupants: HashMap::new(),
                failures: HashMap::new(),
                notices: Vec::new(),
                edited_messages: Vec::new(),
                deleted_messages: Vec::new(),
                dm_blocked: HashSet::new(),
                created_rooms: Vec::new(),
                deleted_rooms: Vec::new(),
                moves: Vec::new(),
            })),
        }
    }

    /// Collaborator set backed by this platform and `history`.
    pub fn collaborators(&self, history: Arc<dyn HistoryArchive>) -> Collaborators {
        Collaborators {
            provisioning: Arc::new(self.clone()),
            notifier: Arc::new(self.clone()),
            history,
            membership: Arc::new(self.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    pub fn add_room(&self, id: RoomId, name: &str, category: Option<CategoryId>) -> RoomHandle {
        self.add_room_with(id, name, category, 0, DEFAULT_BITRATE)
    }

    pub fn add_room_with(
        &self,
        id: RoomId,
        name: &str,
        category: Option<CategoryId>,
        capacity: u32,
        bitrate: u32,
    ) -> RoomHandle {
        let mut state = self.inner.lock().unwrap();
        let handle = RoomHandle {
            id,
            guild_id: state.guild,
            name: name.to_string(),
            category,
            capacity,
            bitrate,
        };
        state.rooms.insert(id, handle.clone());
        handle
    }

    /// Delete a room behind the service's back. Occupants are disconnected.
    pub fn remove_room(&self, id: RoomId) {
        let mut state = self.inner.lock().unwrap();
        state.rooms.remove(&id);
        state.occupants.remove(&id);
    }

    pub fn set_bitrate_limit(&self, limit: u32) {
        self.inner.lock().unwrap().bitrate_limit = limit;
    }

    /// Place `member` in `room`, leaving whatever room they were in.
    /// Returns the previous room.
    pub fn connect(&self, room: RoomId, member: &MemberHandle) -> Option<RoomId> {
        let mut state = self.inner.lock().unwrap();
        let previous = state.detach(member.id).map(|(room, _)| room);
        state.occupants.entry(room).or_default().push(member.clone());
        previous
    }

    /// Disconnect `member`. Returns the room they were in.
    pub fn disconnect(&self, member: MemberId) -> Option<RoomId> {
        self.inner
            .lock()
            .unwrap()
            .detach(member)
            .map(|(room, _)| room)
    }

    pub fn room_of(&self, member: MemberId) -> Option<RoomId> {
        self.inner
            .lock()
            .unwrap()
            .occupants
            .iter()
            .find(|(_, members)| members.iter().any(|m| m.id == member))
            .map(|(room, _)| *room)
    }

    /// Make every later call of `operation` fail with `error`.
    pub fn fail(&self, operation: MockOperation, error: CollaboratorError) {
        self.inner.lock().unwrap().failures.insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    /// Refuse direct messages to `member`, as a member with DMs closed would.
    pub fn block_direct_messages(&self, member: MemberId) {
        self.inner.lock().unwrap().dm_blocked.insert(member);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn has_room(&self, id: RoomId) -> bool {
        self.inner.lock().unwrap().rooms.contains_key(&id)
    }

    pub fn notices(&self) -> Vec<SentNotice> {
        self.inner.lock().unwrap().notices.clone()
    }

    /// Notices sent to `target`, oldest first.
    pub fn notices_to(&self, target: NoticeTarget) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| n.target == target)
            .map(|n| n.notice)
            .collect()
    }

    /// `Notice::kind` of every notice sent to `target`, oldest first.
    pub fn notice_kinds(&self, target: NoticeTarget) -> Vec<&'static str> {
        self.notices_to(target).iter().map(Notice::kind).collect()
    }

    /// Messages edited in place, oldest first.
    pub fn edited_messages(&self) -> Vec<MessageRef> {
        self.inner.lock().unwrap().edited_messages.clone()
    }

    pub fn deleted_messages(&self) -> Vec<MessageRef> {
        self.inner.lock().unwrap().deleted_messages.clone()
    }

    pub fn created_rooms(&self) -> Vec<RoomHandle> {
        self.inner.lock().unwrap().created_rooms.clone()
    }

    pub fn deleted_rooms(&self) -> Vec<RoomId> {
        self.inner.lock().unwrap().deleted_rooms.clone()
    }

    /// Successful moves as `(member, destination)`, oldest first.
    pub fn moves(&self) -> Vec<(MemberId, RoomId)> {
        self.inner.lock().unwrap().moves.clone()
    }
}

#[async_trait]
impl ChannelProvisioning for MockPlatform {
    async fn ensure_personal_room(
        &self,
        guild: GuildId,
        owner: &MemberHandle,
    ) -> Result<Provisioned, CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::EnsurePersonalRoom)?;

        let name = personal_room_name(&owner.display_name);
        let category = Some(state.category);
        let existing = state
            .rooms
            .values()
            .find(|r| r.category == category && r.name == name)
            .map(|r| r.id);
        if let Some(room) = existing {
            return Ok(Provisioned {
                room,
                created: false,
            });
        }

        let handle = state.create(RoomSpec {
            guild_id: guild,
            name,
            category,
            capacity: 0,
            bitrate: DEFAULT_BITRATE,
        });
        Ok(Provisioned {
            room: handle.id,
            created: true,
        })
    }

    async fn create_room(&self, spec: RoomSpec) -> Result<RoomHandle, CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::CreateRoom)?;
        Ok(state.create(spec))
    }

    async fn delete_room(&self, room: RoomId) -> Result<(), CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::DeleteRoom)?;
        if state.rooms.remove(&room).is_none() {
            return Err(CollaboratorError::NotFound(format!("room {room}")));
        }
        state.occupants.remove(&room);
        state.deleted_rooms.push(room);
        Ok(())
    }

    async fn move_member(
        &self,
        _guild: GuildId,
        member: MemberId,
        to: RoomId,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::MoveMember)?;
        if !state.rooms.contains_key(&to) {
            return Err(CollaboratorError::NotFound(format!("room {to}")));
        }
        let Some((_, handle)) = state.detach(member) else {
            return Err(CollaboratorError::Rejected(format!(
                "member {member} is not connected"
            )));
        };
        state.occupants.entry(to).or_default().push(handle);
        state.moves.push((member, to));
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockPlatform {
    async fn send_notice(
        &self,
        target: NoticeTarget,
        notice: Notice,
    ) -> Result<MessageRef, CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::SendNotice)?;
        let channel = match target {
            NoticeTarget::Room(room) => {
                if !state.rooms.contains_key(&room) {
                    return Err(CollaboratorError::NotFound(format!("room {room}")));
                }
                room.get()
            }
            NoticeTarget::NoticeChannel => NOTICE_CHANNEL,
            NoticeTarget::DirectMessage(member) => {
                if state.dm_blocked.contains(&member) {
                    return Err(CollaboratorError::Rejected(format!(
                        "cannot send messages to member {member}"
                    )));
                }
                DM_CHANNEL_BASE + member.get()
            }
        };
        let message = MessageRef::new(channel, state.next_id());
        state.notices.push(SentNotice {
            message,
            target,
            notice,
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        notice: Notice,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::EditMessage)?;
        if state.deleted_messages.contains(&message) {
            return Err(CollaboratorError::NotFound(format!("message {message:?}")));
        }
        let Some(sent) = state.notices.iter_mut().find(|n| n.message == message) else {
            return Err(CollaboratorError::NotFound(format!("message {message:?}")));
        };
        sent.notice = notice;
        state.edited_messages.push(message);
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), CollaboratorError> {
        let mut state = self.inner.lock().unwrap();
        state.check(MockOperation::DeleteMessage)?;
        state.deleted_messages.push(message);
        Ok(())
    }
}

impl Membership for MockPlatform {
    fn room(&self, room: RoomId) -> Option<RoomHandle> {
        self.inner.lock().unwrap().rooms.get(&room).cloned()
    }

    fn members(&self, room: RoomId) -> Vec<MemberHandle> {
        self.inner
            .lock()
            .unwrap()
            .occupants
            .get(&room)
            .cloned()
            .unwrap_or_default()
    }

    fn bitrate_limit(&self, _guild: GuildId) -> u32 {
        self.inner.lock().unwrap().bitrate_limit
    }
}
