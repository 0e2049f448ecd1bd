//! Mention forwarding.
//!
//! An @mention typed in the chat of a voice room in the managed category is
//! delivered to every mentioned member by direct message, with the message
//! text and a link back to it. `@everyone` / `@here` are never forwarded;
//! the room gets a warning instead. A DM the platform refuses is reported
//! back into the room.

use crate::collaborators::{MemberHandle, Membership, Notice, NoticeTarget, Notifier};
use crate::observability::metrics::{
    record_collaborator_failure, record_mention_forward, record_notice_sent,
};
use common::types::{CategoryId, MemberId, RoomId};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A chat message posted in a voice room's text chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMessage {
    pub room: RoomId,
    pub author: MemberHandle,
    pub content: String,
    /// Mentioned members, bots included.
    pub mentions: Vec<MemberHandle>,
    pub mentions_everyone: bool,
    pub jump_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Bot author, unmanaged room, or no member mentions.
    Ignored,
    /// `@everyone` / `@here` was used; nothing was forwarded.
    EveryoneWarned,
    Forwarded { delivered: usize, failed: usize },
}

/// Message text with the given member mentions removed and whitespace
/// collapsed.
#[must_use]
pub fn strip_mentions(content: &str, mentions: &[MemberId]) -> String {
    let mut text = content.to_string();
    for member in mentions {
        text = text
            .replace(&format!("<@{member}>"), "")
            .replace(&format!("<@!{member}>"), "");
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Forwards room chat mentions to direct messages.
#[derive(Clone)]
pub struct MentionForwarder {
    notifier: Arc<dyn Notifier>,
    membership: Arc<dyn Membership>,
    category: CategoryId,
}

impl MentionForwarder {
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        membership: Arc<dyn Membership>,
        category: CategoryId,
    ) -> Self {
        Self {
            notifier,
            membership,
            category,
        }
    }

    #[instrument(skip_all, name = "vc.forward", fields(room = %message.room))]
    pub async fn forward(&self, message: &RoomMessage) -> ForwardOutcome {
        if message.author.is_bot {
            return ForwardOutcome::Ignored;
        }
        let Some(room) = self.membership.room(message.room) else {
            return ForwardOutcome::Ignored;
        };
        if room.category != Some(self.category) {
            return ForwardOutcome::Ignored;
        }

        if message.mentions_everyone {
            record_mention_forward("everyone_blocked");
            self.post(NoticeTarget::Room(message.room), Notice::MentionEveryoneWarning)
                .await;
            return ForwardOutcome::EveryoneWarned;
        }

        let targets: Vec<&MemberHandle> = message.mentions.iter().filter(|m| !m.is_bot).collect();
        if targets.is_empty() {
            return ForwardOutcome::Ignored;
        }

        let mentioned: Vec<MemberId> = message.mentions.iter().map(|m| m.id).collect();
        let excerpt = strip_mentions(&message.content, &mentioned);

        let mut delivered = 0;
        let mut failed = 0;
        for target in targets {
            let notice = Notice::MentionForward {
                author_name: message.author.display_name.clone(),
                room_name: room.name.clone(),
                excerpt: excerpt.clone(),
                jump_url: message.jump_url.clone(),
            };
            match self
                .notifier
                .send_notice(NoticeTarget::DirectMessage(target.id), notice)
                .await
            {
                Ok(_) => {
                    delivered += 1;
                    record_mention_forward("delivered");
                    record_notice_sent("mention_forward");
                }
                Err(e) => {
                    failed += 1;
                    record_mention_forward("failed");
                    record_collaborator_failure("send_direct_message", e.kind());
                    debug!(
                        target: "vc.forward",
                        member = %target.id,
                        error = %e,
                        "Direct message refused"
                    );
                    self.post(
                        NoticeTarget::Room(message.room),
                        Notice::DirectMessageFailed { member: target.id },
                    )
                    .await;
                }
            }
        }

        ForwardOutcome::Forwarded { delivered, failed }
    }

    async fn post(&self, target: NoticeTarget, notice: Notice) {
        let kind = notice.kind();
        match self.notifier.send_notice(target, notice).await {
            Ok(_) => record_notice_sent(kind),
            Err(e) => {
                record_collaborator_failure("send_notice", e.kind());
                warn!(target: "vc.forward", error = %e, kind, "Failed to post notice");
            }
        }
    }
}
