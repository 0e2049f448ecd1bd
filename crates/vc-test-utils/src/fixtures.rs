//! Test fixtures: well-known ids, members, timestamps and a harness that
//! wires the lifecycle engine to the mocks.

use crate::mock_history::RecordingHistory;
use crate::mock_platform::MockPlatform;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use common::types::{CategoryId, GuildId, MemberId, RoomId};
use std::sync::Arc;
use std::time::Duration;
use vc_service::actors::{
    ActorMetrics, LifecycleControllerHandle, LifecycleSettings, RoomLifecycle,
};
use vc_service::collaborators::{Collaborators, MemberHandle, Requester};
use vc_service::dispatcher::{EventDispatcher, VoiceStateChange, VoiceTransition};
use vc_service::scheduler::{DeletionScheduler, DeletionTimings};
use vc_service::session::ProvisionedRooms;

pub const GUILD: GuildId = GuildId(1);
pub const CATEGORY: CategoryId = CategoryId(2);
pub const BASE_ROOM: RoomId = RoomId(100);

/// Pre-existing managed rooms.
pub const ROOM_A: RoomId = RoomId(200);
pub const ROOM_B: RoomId = RoomId(201);

/// Pre-existing room outside the managed category.
pub const UNMANAGED_ROOM: RoomId = RoomId(300);

pub const FIRST_EMPTY_NOTICE: Duration = Duration::from_secs(10);
pub const FINAL_DELETE: Duration = Duration::from_secs(20);

pub fn member(id: u64, name: &str) -> MemberHandle {
    MemberHandle {
        id: MemberId(id),
        display_name: name.to_string(),
        is_bot: false,
    }
}

pub fn bot(id: u64, name: &str) -> MemberHandle {
    MemberHandle {
        id: MemberId(id),
        display_name: name.to_string(),
        is_bot: true,
    }
}

pub fn requester(id: u64) -> Requester {
    Requester {
        id: MemberId(id),
        is_admin: false,
    }
}

pub fn admin(id: u64) -> Requester {
    Requester {
        id: MemberId(id),
        is_admin: true,
    }
}

/// Fixed session clock: `seconds` after 2024-05-01 10:00:00 UTC.
pub fn t(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + ChronoDuration::seconds(seconds)
}

pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        base_room: BASE_ROOM,
        category: CATEGORY,
    }
}

/// Lifecycle engine wired to in-memory collaborators.
///
/// The platform starts with the base room, [`ROOM_A`], [`ROOM_B`] and
/// [`UNMANAGED_ROOM`]. Must be created inside a Tokio runtime.
pub struct TestHarness {
    pub platform: MockPlatform,
    pub history: RecordingHistory,
    pub provisioned: ProvisionedRooms,
    pub controller: LifecycleControllerHandle,
    pub scheduler: DeletionScheduler,
    pub dispatcher: EventDispatcher,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_timings(DeletionTimings {
            first_empty_notice: FIRST_EMPTY_NOTICE,
            final_delete: FINAL_DELETE,
        })
    }

    pub fn with_timings(timings: DeletionTimings) -> Self {
        let platform = MockPlatform::new(GUILD, CATEGORY);
        platform.add_room(BASE_ROOM, "lobby", Some(CATEGORY));
        platform.add_room(ROOM_A, "alice\u{306E}VC", Some(CATEGORY));
        platform.add_room(ROOM_B, "bob\u{306E}VC", Some(CATEGORY));
        platform.add_room(UNMANAGED_ROOM, "general", None);

        let history = RecordingHistory::new();
        let collaborators: Collaborators = platform.collaborators(Arc::new(history.clone()));
        let provisioned = ProvisionedRooms::new();

        let controller = LifecycleControllerHandle::new(RoomLifecycle::new(
            settings(),
            collaborators.clone(),
            provisioned.clone(),
            ActorMetrics::new(),
        ));
        let scheduler = DeletionScheduler::new(
            timings,
            BASE_ROOM,
            collaborators,
            provisioned.clone(),
            controller.child_token(),
        );
        let dispatcher = EventDispatcher::new(
            settings(),
            controller.clone(),
            scheduler.clone(),
            Arc::new(platform.clone()),
        );

        Self {
            platform,
            history,
            provisioned,
            controller,
            scheduler,
            dispatcher,
        }
    }

    /// Connect `member` to `room` (leaving any previous room) and dispatch
    /// the resulting voice state change.
    pub async fn join(
        &self,
        member: &MemberHandle,
        room: RoomId,
        at: DateTime<Utc>,
    ) -> VoiceTransition {
        let before = self.platform.connect(room, member);
        self.dispatch(member, before, Some(room), at).await
    }

    /// Disconnect `member` and dispatch the change.
    pub async fn leave(&self, member: &MemberHandle, at: DateTime<Utc>) -> VoiceTransition {
        let before = self.platform.disconnect(member.id);
        self.dispatch(member, before, None, at).await
    }

    /// Dispatch a change without touching the platform state (for moves
    /// the service requested itself, which the mock already applied).
    pub async fn dispatch(
        &self,
        member: &MemberHandle,
        before: Option<RoomId>,
        after: Option<RoomId>,
        at: DateTime<Utc>,
    ) -> VoiceTransition {
        self.dispatcher
            .dispatch(VoiceStateChange {
                guild_id: GUILD,
                member: member.clone(),
                before,
                after,
                at,
            })
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
