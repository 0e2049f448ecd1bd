//! Mention forwarding tests.
//!
//! Covers:
//! - Direct messages to mentioned members, with the mention text removed
//! - Bots and unmanaged rooms are skipped
//! - `@everyone` / `@here` only produce a warning
//! - Refused direct messages are reported in the room

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use common::types::MemberId;
use vc_service::collaborators::{MemberHandle, Notice, NoticeTarget};
use vc_service::forward::{ForwardOutcome, MentionForwarder, RoomMessage};
use vc_test_utils::*;

const JUMP_URL: &str = "https://discord.com/channels/1/200/77";

fn platform() -> MockPlatform {
    let platform = MockPlatform::new(GUILD, CATEGORY);
    platform.add_room(ROOM_A, "alice\u{306E}VC", Some(CATEGORY));
    platform.add_room(UNMANAGED_ROOM, "general", None);
    platform
}

fn forwarder(platform: &MockPlatform) -> MentionForwarder {
    MentionForwarder::new(
        Arc::new(platform.clone()),
        Arc::new(platform.clone()),
        CATEGORY,
    )
}

fn message(author: MemberHandle, content: &str, mentions: Vec<MemberHandle>) -> RoomMessage {
    RoomMessage {
        room: ROOM_A,
        author,
        content: content.to_string(),
        mentions,
        mentions_everyone: false,
        jump_url: JUMP_URL.to_string(),
    }
}

#[tokio::test]
async fn test_mention_delivered_by_direct_message() {
    let platform = platform();
    let msg = message(
        member(1, "alice"),
        "<@2> come back, we start in 5",
        vec![member(2, "bob")],
    );

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(
        outcome,
        ForwardOutcome::Forwarded {
            delivered: 1,
            failed: 0
        }
    );
    let sent = platform.notices_to(NoticeTarget::DirectMessage(MemberId(2)));
    assert_eq!(
        sent,
        vec![Notice::MentionForward {
            author_name: "alice".to_string(),
            room_name: "alice\u{306E}VC".to_string(),
            excerpt: "come back, we start in 5".to_string(),
            jump_url: JUMP_URL.to_string(),
        }]
    );
    assert!(platform.notices_to(NoticeTarget::Room(ROOM_A)).is_empty());
}

#[tokio::test]
async fn test_each_mentioned_member_gets_one_message() {
    let platform = platform();
    let msg = message(
        member(1, "alice"),
        "<@!2> <@3>",
        vec![member(2, "bob"), member(3, "carol")],
    );

    forwarder(&platform).forward(&msg).await;

    for id in [2, 3] {
        let sent = platform.notices_to(NoticeTarget::DirectMessage(MemberId(id)));
        assert_eq!(sent.len(), 1);
        match sent.first().unwrap() {
            Notice::MentionForward { excerpt, .. } => assert!(excerpt.is_empty()),
            other => panic!("expected mention forward, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_bot_mentions_skipped() {
    let platform = platform();
    let msg = message(
        member(1, "alice"),
        "<@9> play <@2>",
        vec![bot(9, "music"), member(2, "bob")],
    );

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(
        outcome,
        ForwardOutcome::Forwarded {
            delivered: 1,
            failed: 0
        }
    );
    assert!(platform
        .notices_to(NoticeTarget::DirectMessage(MemberId(9)))
        .is_empty());
}

#[tokio::test]
async fn test_only_bot_mentions_ignored() {
    let platform = platform();
    let msg = message(member(1, "alice"), "<@9> skip", vec![bot(9, "music")]);

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(outcome, ForwardOutcome::Ignored);
    assert!(platform.notices().is_empty());
}

#[tokio::test]
async fn test_bot_author_ignored() {
    let platform = platform();
    let msg = message(bot(9, "music"), "<@2> now playing", vec![member(2, "bob")]);

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(outcome, ForwardOutcome::Ignored);
    assert!(platform.notices().is_empty());
}

#[tokio::test]
async fn test_everyone_mention_only_warns() {
    let platform = platform();
    let mut msg = message(member(1, "alice"), "@everyone <@2> join", vec![member(2, "bob")]);
    msg.mentions_everyone = true;

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(outcome, ForwardOutcome::EveryoneWarned);
    assert_eq!(
        platform.notices_to(NoticeTarget::Room(ROOM_A)),
        vec![Notice::MentionEveryoneWarning]
    );
    assert!(platform
        .notices_to(NoticeTarget::DirectMessage(MemberId(2)))
        .is_empty());
}

#[tokio::test]
async fn test_refused_direct_message_reported_in_room() {
    let platform = platform();
    platform.block_direct_messages(MemberId(3));
    let msg = message(
        member(1, "alice"),
        "<@2> <@3> ready?",
        vec![member(2, "bob"), member(3, "carol")],
    );

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(
        outcome,
        ForwardOutcome::Forwarded {
            delivered: 1,
            failed: 1
        }
    );
    assert_eq!(
        platform.notices_to(NoticeTarget::Room(ROOM_A)),
        vec![Notice::DirectMessageFailed { member: MemberId(3) }]
    );
    assert_eq!(
        platform
            .notices_to(NoticeTarget::DirectMessage(MemberId(2)))
            .len(),
        1
    );
}

#[tokio::test]
async fn test_unmanaged_room_ignored() {
    let platform = platform();
    let mut msg = message(member(1, "alice"), "<@2> hi", vec![member(2, "bob")]);
    msg.room = UNMANAGED_ROOM;

    let outcome = forwarder(&platform).forward(&msg).await;

    assert_eq!(outcome, ForwardOutcome::Ignored);
    assert!(platform.notices().is_empty());
}
