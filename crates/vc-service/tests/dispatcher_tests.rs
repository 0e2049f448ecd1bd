//! Event dispatcher integration tests.
//!
//! Feeds raw before/after voice state changes through the dispatcher and
//! checks both the classification and its effect on sessions and pending
//! deletions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::types::MemberId;
use vc_service::collaborators::{CollaboratorError, NoticeTarget};
use vc_service::dispatcher::VoiceTransition;
use vc_test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_mute_toggle_is_noop() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;
    let notices_before = harness.platform.notices().len();

    let transition = harness
        .dispatch(&alice, Some(ROOM_A), Some(ROOM_A), t(10))
        .await;

    assert_eq!(transition, VoiceTransition::NoOp);
    assert_eq!(harness.platform.notices().len(), notices_before);
    let snapshot = harness.controller.get_session(ROOM_A, t(10)).await.unwrap();
    assert!(snapshot.participant(MemberId(1)).unwrap().connected);
}

#[tokio::test(start_paused = true)]
async fn test_move_between_sessions_ends_one_and_starts_other() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;

    let transition = harness.join(&alice, ROOM_B, t(60)).await;

    assert_eq!(
        transition,
        VoiceTransition::Moved {
            from: ROOM_A,
            to: ROOM_B
        }
    );
    let record = harness.history.records().pop().unwrap();
    assert_eq!(record.room_id, ROOM_A);
    assert_eq!(record.participants.get(&MemberId(1)).unwrap().total_seconds, 60);

    let snapshot = harness.controller.get_session(ROOM_B, t(60)).await.unwrap();
    assert_eq!(snapshot.started_at, t(60));
    assert!(harness.scheduler.is_pending(ROOM_A).await);
    assert!(!harness.scheduler.is_pending(ROOM_B).await);
}

#[tokio::test(start_paused = true)]
async fn test_move_to_unmanaged_room_is_a_leave() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;

    let transition = harness.join(&alice, UNMANAGED_ROOM, t(30)).await;

    assert_eq!(transition, VoiceTransition::Left { room: ROOM_A });
    assert_eq!(harness.history.records().len(), 1);
    assert!(harness.scheduler.is_pending(ROOM_A).await);
}

#[tokio::test(start_paused = true)]
async fn test_move_from_unmanaged_room_is_an_enter() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, UNMANAGED_ROOM, t(0)).await;

    let transition = harness.join(&alice, ROOM_A, t(30)).await;

    assert_eq!(transition, VoiceTransition::Entered { room: ROOM_A });
    assert!(harness.controller.get_session(ROOM_A, t(30)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_moving_to_base_leaves_managed_room() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_B, t(0)).await;

    let transition = harness.join(&alice, BASE_ROOM, t(30)).await;

    assert_eq!(
        transition,
        VoiceTransition::EnteredBase {
            left: Some(ROOM_B)
        }
    );
    // ROOM_B session ended, alice was sent on to her existing personal room
    assert_eq!(harness.history.records().pop().unwrap().room_id, ROOM_B);
    assert_eq!(harness.platform.room_of(alice.id), Some(ROOM_A));
    assert!(harness.scheduler.is_pending(ROOM_B).await);
}

#[tokio::test(start_paused = true)]
async fn test_entering_cancels_pending_deletion() {
    let harness = TestHarness::new();
    assert!(harness.scheduler.schedule(ROOM_B).await);

    harness.join(&member(2, "bob"), ROOM_B, t(0)).await;

    assert!(!harness.scheduler.is_pending(ROOM_B).await);
}

#[tokio::test(start_paused = true)]
async fn test_partial_leave_does_not_schedule() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;
    harness.join(&member(2, "bob"), ROOM_A, t(0)).await;

    harness.leave(&alice, t(30)).await;

    assert!(!harness.scheduler.is_pending(ROOM_A).await);
    assert_eq!(
        harness.platform.notice_kinds(NoticeTarget::Room(ROOM_A)),
        vec!["join", "join", "leave"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_leave_is_benign() {
    let harness = TestHarness::new();

    // Leave for a room the member was never seen entering
    let transition = harness
        .dispatch(&member(1, "alice"), Some(ROOM_B), None, t(0))
        .await;

    assert_eq!(transition, VoiceTransition::Left { room: ROOM_B });
    assert!(harness.controller.list_sessions(t(0)).await.unwrap().is_empty());
    // An empty managed room still gets cleaned up
    assert!(harness.scheduler.is_pending(ROOM_B).await);
}

#[tokio::test(start_paused = true)]
async fn test_bot_movements_are_ignored() {
    let harness = TestHarness::new();
    let music = bot(9, "music");

    assert_eq!(harness.join(&music, ROOM_A, t(0)).await, VoiceTransition::NoOp);
    assert_eq!(harness.leave(&music, t(10)).await, VoiceTransition::NoOp);
    assert_eq!(harness.scheduler.pending_count().await, 0);
    assert!(harness.platform.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_from_deleted_team_room_closes_presence() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    let bob = member(2, "bob");
    harness.join(&alice, ROOM_A, t(0)).await;
    harness.join(&bob, ROOM_A, t(0)).await;
    harness
        .controller
        .assign_team(ROOM_A, bob.id, "A", t(0))
        .await
        .unwrap();
    harness.controller.split_teams(ROOM_A, requester(1), t(5)).await.unwrap();
    let team_room = harness.platform.room_of(bob.id).unwrap();
    harness
        .dispatch(&bob, Some(ROOM_A), Some(team_room), t(10))
        .await;

    // Team room vanishes (gathered while bob's move back failed)
    harness.platform.fail(
        MockOperation::MoveMember,
        CollaboratorError::Rejected("missing permissions".into()),
    );
    harness
        .controller
        .gather_teams(ROOM_A, requester(1), t(60))
        .await
        .unwrap();
    assert!(!harness.platform.has_room(team_room));
    harness.platform.clear_failures();

    let transition = harness.dispatch(&bob, Some(team_room), None, t(100)).await;
    assert_eq!(transition, VoiceTransition::Left { room: team_room });

    let snapshot = harness.controller.get_session(ROOM_A, t(200)).await.unwrap();
    let record = snapshot.participant(bob.id).unwrap();
    assert!(!record.connected);
    assert_eq!(record.total_seconds, 100);
}
