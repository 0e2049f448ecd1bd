//! Session lifecycle tests.
//!
//! Drives the lifecycle actor through the dispatcher with in-memory
//! collaborators and checks:
//! - Presence totals across leave/rejoin cycles
//! - Session start/end notices and history archival
//! - Adoption of rooms that were occupied before the service saw them
//! - Personal room provisioning from the base room
//! - Benign handling of bots, unmanaged rooms and unknown rooms

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use common::types::{MemberId, RoomId};
use vc_service::actors::{EnterOutcome, LeaveOutcome};
use vc_service::collaborators::{CollaboratorError, Notice, NoticeTarget};
use vc_service::dispatcher::VoiceTransition;
use vc_service::errors::LifecycleError;
use vc_test_utils::*;

// ============================================================================
// Presence accounting
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rejoin_accumulates_total_across_intervals() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    let bob = member(2, "bob");

    harness.join(&alice, ROOM_A, t(0)).await;
    harness.join(&bob, ROOM_A, t(0)).await;

    // 10:05:00 leave, 10:06:00 rejoin, session ends 10:06:30
    harness.leave(&alice, t(300)).await;
    let snapshot = harness.controller.get_session(ROOM_A, t(300)).await.unwrap();
    let record = snapshot.participant(MemberId(1)).unwrap();
    assert_eq!(record.total_seconds, 300);
    assert!(!record.connected);

    harness.join(&alice, ROOM_A, t(360)).await;
    harness.leave(&bob, t(390)).await;
    harness.leave(&alice, t(390)).await;

    let records = harness.history.records();
    assert_eq!(records.len(), 1);
    let record = records.first().unwrap();
    assert_eq!(record.room_id, ROOM_A);
    assert_eq!(record.duration_seconds, 390);
    assert_eq!(record.participants.get(&MemberId(1)).unwrap().total_seconds, 330);
    assert_eq!(record.participants.get(&MemberId(2)).unwrap().total_seconds, 390);
}

#[tokio::test(start_paused = true)]
async fn test_live_reads_do_not_mutate_totals() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;

    let first = harness.controller.get_session(ROOM_A, t(100)).await.unwrap();
    let second = harness.controller.get_session(ROOM_A, t(100)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.participant(MemberId(1)).unwrap().total_seconds, 100);
    assert_eq!(first.elapsed_seconds, 100);

    // Final total is still the full span, not 100 + span
    harness.leave(&alice, t(250)).await;
    let record = harness.history.records().pop().unwrap();
    assert_eq!(record.participants.get(&MemberId(1)).unwrap().total_seconds, 250);
}

// ============================================================================
// Session start and end
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_join_starts_session_with_notice() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");

    let transition = harness.join(&alice, ROOM_A, t(0)).await;
    assert_eq!(transition, VoiceTransition::Entered { room: ROOM_A });

    let snapshot = harness.controller.get_session(ROOM_A, t(0)).await.unwrap();
    assert_eq!(snapshot.starter_id, MemberId(1));
    assert_eq!(snapshot.started_at, t(0));

    let notices = harness.platform.notices_to(NoticeTarget::NoticeChannel);
    assert_eq!(
        notices,
        vec![Notice::SessionStarted {
            room_name: "alice\u{306E}VC".to_string(),
            starter_id: MemberId(1),
            starter_name: "alice".to_string(),
            started_at: t(0),
        }]
    );
    assert_eq!(harness.platform.notice_kinds(NoticeTarget::Room(ROOM_A)), vec!["join"]);
}

#[tokio::test(start_paused = true)]
async fn test_second_join_registers_without_new_session() {
    let harness = TestHarness::new();
    harness.join(&member(1, "alice"), ROOM_A, t(0)).await;

    let outcome = harness
        .controller
        .member_entered(ROOM_A, member(2, "bob"), t(30))
        .await
        .unwrap();

    assert_eq!(outcome, EnterOutcome::Joined { anchor: ROOM_A });
    let snapshot = harness.controller.get_session(ROOM_A, t(30)).await.unwrap();
    assert_eq!(snapshot.starter_id, MemberId(1));
    assert_eq!(snapshot.participants.len(), 2);
    assert_eq!(
        harness.platform.notice_kinds(NoticeTarget::NoticeChannel),
        vec!["session_start"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_last_leave_ends_session_and_archives() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    let bob = member(2, "bob");
    harness.join(&alice, ROOM_A, t(0)).await;
    harness.join(&bob, ROOM_A, t(60)).await;

    harness.leave(&alice, t(120)).await;
    assert!(harness.controller.get_session(ROOM_A, t(120)).await.is_ok());

    harness.leave(&bob, t(180)).await;
    let err = harness
        .controller
        .get_session(ROOM_A, t(180))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::SessionNotFound(room) if room == ROOM_A));

    // Start notice is deleted, summary is sent
    let start = harness
        .platform
        .notices()
        .into_iter()
        .find(|n| matches!(n.notice, Notice::SessionStarted { .. }))
        .unwrap();
    assert!(harness.platform.deleted_messages().contains(&start.message));

    let summary = harness
        .platform
        .notices_to(NoticeTarget::NoticeChannel)
        .pop()
        .unwrap();
    match summary {
        Notice::SessionEnded {
            started_at,
            ended_at,
            participants,
            ..
        } => {
            assert_eq!(started_at, t(0));
            assert_eq!(ended_at, t(180));
            let names: Vec<_> = participants.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["alice", "bob"]);
        }
        other => panic!("expected session summary, got {other:?}"),
    }

    let record = harness.history.records().pop().unwrap();
    assert_eq!(record.started_at, t(0));
    assert_eq!(record.ended_at, t(180));
    assert_eq!(record.participants.len(), 2);

    let status = harness.controller.get_status().await.unwrap();
    assert_eq!(status.active_sessions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_session_after_end_starts_fresh() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    let bob = member(2, "bob");

    harness.join(&alice, ROOM_A, t(0)).await;
    harness.leave(&alice, t(100)).await;
    harness.join(&bob, ROOM_A, t(105)).await;

    let snapshot = harness.controller.get_session(ROOM_A, t(110)).await.unwrap();
    assert_eq!(snapshot.starter_id, MemberId(2));
    assert_eq!(snapshot.started_at, t(105));
    assert!(snapshot.participant(MemberId(1)).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_occupied_room_is_adopted_without_start_notice() {
    let harness = TestHarness::new();
    // Bob was connected before the service started
    harness.platform.connect(ROOM_A, &member(2, "bob"));

    let alice = member(1, "alice");
    harness.platform.connect(ROOM_A, &alice);
    let outcome = harness
        .controller
        .member_entered(ROOM_A, alice, t(0))
        .await
        .unwrap();

    assert_eq!(outcome, EnterOutcome::Adopted { anchor: ROOM_A });
    assert!(harness
        .platform
        .notice_kinds(NoticeTarget::NoticeChannel)
        .is_empty());
    let snapshot = harness.controller.get_session(ROOM_A, t(0)).await.unwrap();
    assert!(snapshot.participant(MemberId(2)).unwrap().connected);
}

// ============================================================================
// Failures and benign no-ops
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_history_failure_does_not_block_termination() {
    let harness = TestHarness::new();
    harness
        .history
        .fail_with(CollaboratorError::Unavailable("database locked".into()));
    let alice = member(1, "alice");

    harness.join(&alice, ROOM_A, t(0)).await;
    harness.leave(&alice, t(10)).await;

    assert!(harness.controller.list_sessions(t(10)).await.unwrap().is_empty());
    assert_eq!(
        harness.platform.notice_kinds(NoticeTarget::NoticeChannel),
        vec!["session_start", "session_end"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_notice_failures_do_not_block_sessions() {
    let harness = TestHarness::new();
    harness.platform.fail(
        vc_test_utils::MockOperation::SendNotice,
        CollaboratorError::Rejected("missing permissions".into()),
    );
    let alice = member(1, "alice");

    harness.join(&alice, ROOM_A, t(0)).await;
    assert!(harness.controller.get_session(ROOM_A, t(0)).await.is_ok());

    harness.leave(&alice, t(30)).await;
    assert_eq!(harness.history.records().len(), 1);
    assert!(harness.platform.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_leave_without_session_is_untracked() {
    let harness = TestHarness::new();

    let outcome = harness
        .controller
        .member_left(ROOM_B, member(1, "alice"), t(0))
        .await
        .unwrap();

    assert_eq!(outcome, LeaveOutcome::Untracked);
    assert!(harness.history.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bots_never_start_sessions() {
    let harness = TestHarness::new();

    let transition = harness.join(&bot(9, "music"), ROOM_A, t(0)).await;

    assert_eq!(transition, VoiceTransition::NoOp);
    assert!(harness.controller.list_sessions(t(0)).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bot_does_not_keep_session_alive() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;
    harness.join(&bot(9, "music"), ROOM_A, t(5)).await;

    harness.leave(&alice, t(60)).await;

    assert_eq!(harness.history.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unmanaged_room_is_ignored() {
    let harness = TestHarness::new();

    let transition = harness.join(&member(1, "alice"), UNMANAGED_ROOM, t(0)).await;
    assert_eq!(transition, VoiceTransition::NoOp);

    let err = harness
        .controller
        .member_entered(UNMANAGED_ROOM, member(1, "alice"), t(0))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotManaged(_)));
    assert!(harness.controller.list_sessions(t(0)).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_enter_vanished_room_is_ignored() {
    let harness = TestHarness::new();

    let outcome = harness
        .controller
        .member_entered(RoomId(999), member(1, "alice"), t(0))
        .await
        .unwrap();

    assert_eq!(outcome, EnterOutcome::Ignored);
}

// ============================================================================
// Personal room provisioning
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_base_room_provisions_personal_room() {
    let harness = TestHarness::new();
    let carol = member(3, "carol");

    let transition = harness.join(&carol, BASE_ROOM, t(0)).await;
    assert_eq!(transition, VoiceTransition::EnteredBase { left: None });

    let created = harness.platform.created_rooms();
    assert_eq!(created.len(), 1);
    let personal = created.first().unwrap().clone();
    assert_eq!(personal.name, "carol\u{306E}VC");
    assert_eq!(personal.category, Some(CATEGORY));
    assert_eq!(harness.platform.room_of(carol.id), Some(personal.id));
    assert!(harness.provisioned.contains(personal.id).await);

    // The base room itself never hosts a session
    assert!(harness.controller.get_session(BASE_ROOM, t(0)).await.is_err());

    // The platform then reports the move out of the base room
    let transition = harness
        .dispatch(&carol, Some(BASE_ROOM), Some(personal.id), t(1))
        .await;
    assert_eq!(transition, VoiceTransition::Entered { room: personal.id });
    let snapshot = harness.controller.get_session(personal.id, t(1)).await.unwrap();
    assert_eq!(snapshot.starter_id, carol.id);
}

#[tokio::test(start_paused = true)]
async fn test_existing_personal_room_is_reused() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.platform.connect(BASE_ROOM, &alice);

    let outcome = harness
        .controller
        .member_entered(BASE_ROOM, alice.clone(), t(0))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        EnterOutcome::Provisioned {
            room: ROOM_A,
            created: false
        }
    );
    assert!(harness.platform.created_rooms().is_empty());
    assert_eq!(harness.platform.room_of(alice.id), Some(ROOM_A));
    assert!(!harness.provisioned.contains(ROOM_A).await);
}

#[tokio::test(start_paused = true)]
async fn test_provisioning_failure_is_reported() {
    let harness = TestHarness::new();
    harness.platform.fail(
        vc_test_utils::MockOperation::EnsurePersonalRoom,
        CollaboratorError::Rejected("channel limit reached".into()),
    );

    let err = harness
        .controller
        .member_entered(BASE_ROOM, member(3, "carol"), t(0))
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Collaborator(_)));
    assert!(harness.platform.moves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_list_sessions_ordered_by_start() {
    let harness = TestHarness::new();
    harness.join(&member(2, "bob"), ROOM_B, t(0)).await;
    harness.join(&member(1, "alice"), ROOM_A, t(30)).await;

    let sessions = harness.controller.list_sessions(t(60)).await.unwrap();
    let rooms: Vec<_> = sessions.iter().map(|s| s.room_id).collect();
    assert_eq!(rooms, vec![ROOM_B, ROOM_A]);

    let status = harness.controller.get_status().await.unwrap();
    assert_eq!(status.active_sessions, 2);
    assert_eq!(status.connected_participants, 2);
    assert!(status.messages_processed > 0);
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_mailbox_backlog() {
    let harness = TestHarness::new();
    let controller = &harness.controller;

    // All five requests are queued before the actor runs
    let (first, _, _, _, last) = tokio::join!(
        controller.get_status(),
        controller.get_status(),
        controller.get_status(),
        controller.get_status(),
        controller.get_status(),
    );

    let first = first.unwrap();
    assert_eq!(first.mailbox_peak_depth, 5);
    assert_eq!(first.mailbox_depth, 5);
    let last = last.unwrap();
    assert_eq!(last.mailbox_depth, 1);
    assert_eq!(last.messages_processed, 4);

    let status = controller.get_status().await.unwrap();
    assert_eq!(status.mailbox_peak_depth, 5);
    assert_eq!(status.mailbox_depth, 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_counts_started_and_ended_sessions() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;
    harness.join(&member(2, "bob"), ROOM_B, t(0)).await;
    harness.leave(&alice, t(60)).await;

    let status = harness.controller.get_status().await.unwrap();
    assert_eq!(status.sessions_started, 2);
    assert_eq!(status.sessions_ended, 1);
    assert_eq!(status.active_sessions, 1);
}
