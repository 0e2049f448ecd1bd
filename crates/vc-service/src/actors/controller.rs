//! `LifecycleControllerActor` - single owner of all session state.
//!
//! Every voice event and team command funnels through one mailbox so the
//! session store is only ever touched by one task. Handlers await
//! collaborator calls inline; a slow platform shows up as mailbox depth,
//! never as a data race.
//!
//! # Graceful Shutdown
//!
//! Cancelling the token stops the loop after the message in flight. Open
//! sessions are not flushed: on restart, occupied rooms are adopted again
//! from live membership.

use super::lifecycle::RoomLifecycle;
use super::messages::{ControllerStatus, EnterOutcome, LeaveOutcome, LifecycleMessage, MoveOutcome};
use super::metrics::MailboxMonitor;
use crate::collaborators::{MemberHandle, Requester};
use crate::errors::LifecycleError;
use crate::observability::metrics::record_message_latency;
use crate::session::{SessionSnapshot, TeamLabel};

use chrono::{DateTime, Utc};
use common::types::{MemberId, MessageRef, RoomId};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Default channel buffer size for the lifecycle mailbox.
const LIFECYCLE_CHANNEL_BUFFER: usize = 1000;

/// Handle to the `LifecycleControllerActor`.
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct LifecycleControllerHandle {
    sender: mpsc::Sender<LifecycleMessage>,
    cancel_token: CancellationToken,
}

impl LifecycleControllerHandle {
    /// Spawn the actor around `lifecycle` and return a handle to it.
    #[must_use]
    pub fn new(lifecycle: RoomLifecycle) -> Self {
        let (sender, receiver) = mpsc::channel(LIFECYCLE_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = LifecycleControllerActor::new(lifecycle, receiver, cancel_token.clone());
        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LifecycleMessage,
    ) -> Result<T, LifecycleError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| LifecycleError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| LifecycleError::Internal(format!("response receive failed: {e}")))
    }

    pub async fn member_entered(
        &self,
        room: RoomId,
        member: MemberHandle,
        at: DateTime<Utc>,
    ) -> Result<EnterOutcome, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::MemberEntered {
            room,
            member,
            at,
            respond_to,
        })
        .await?
    }

    pub async fn member_left(
        &self,
        room: RoomId,
        member: MemberHandle,
        at: DateTime<Utc>,
    ) -> Result<LeaveOutcome, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::MemberLeft {
            room,
            member,
            at,
            respond_to,
        })
        .await?
    }

    pub async fn member_moved(
        &self,
        from: RoomId,
        to: RoomId,
        member: MemberHandle,
        at: DateTime<Utc>,
    ) -> Result<MoveOutcome, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::MemberMoved {
            from,
            to,
            member,
            at,
            respond_to,
        })
        .await?
    }

    /// Assign `member` to the team named `label` (`"A"` to `"D"`).
    pub async fn assign_team(
        &self,
        room: RoomId,
        member: MemberId,
        label: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let label: TeamLabel = label.parse()?;
        self.request(|respond_to| LifecycleMessage::AssignTeam {
            room,
            member,
            label,
            at,
            respond_to,
        })
        .await?
    }

    /// Split the room's session into team rooms. A room without a session
    /// is adopted from live membership first.
    pub async fn split_teams(
        &self,
        room: RoomId,
        requester: Requester,
        at: DateTime<Utc>,
    ) -> Result<usize, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::SplitTeams {
            room,
            requester,
            at,
            respond_to,
        })
        .await?
    }

    pub async fn gather_teams(
        &self,
        room: RoomId,
        requester: Requester,
        at: DateTime<Utc>,
    ) -> Result<usize, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::GatherTeams {
            room,
            requester,
            at,
            respond_to,
        })
        .await?
    }

    pub async fn post_team_panel(
        &self,
        room: RoomId,
        requester: Requester,
        at: DateTime<Utc>,
    ) -> Result<MessageRef, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::PostTeamPanel {
            room,
            requester,
            at,
            respond_to,
        })
        .await?
    }

    pub async fn room_for_panel(
        &self,
        message: MessageRef,
    ) -> Result<Option<RoomId>, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::RoomForPanel {
            message,
            respond_to,
        })
        .await
    }

    pub async fn list_sessions(
        &self,
        at: DateTime<Utc>,
    ) -> Result<Vec<SessionSnapshot>, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::ListSessions { at, respond_to })
            .await
    }

    pub async fn get_session(
        &self,
        room: RoomId,
        at: DateTime<Utc>,
    ) -> Result<SessionSnapshot, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::GetSession {
            room,
            at,
            respond_to,
        })
        .await?
    }

    pub async fn get_status(&self) -> Result<ControllerStatus, LifecycleError> {
        self.request(|respond_to| LifecycleMessage::GetStatus { respond_to })
            .await
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Child token for tasks that must stop with the controller.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// The `LifecycleControllerActor` implementation.
pub struct LifecycleControllerActor {
    lifecycle: RoomLifecycle,
    receiver: mpsc::Receiver<LifecycleMessage>,
    cancel_token: CancellationToken,
    mailbox: MailboxMonitor,
}

impl LifecycleControllerActor {
    fn new(
        lifecycle: RoomLifecycle,
        receiver: mpsc::Receiver<LifecycleMessage>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            lifecycle,
            receiver,
            cancel_token,
            mailbox: MailboxMonitor::lifecycle(),
        }
    }

    /// Run the actor message loop.
    #[instrument(
        skip_all,
        name = "vc.actor.lifecycle",
        fields(base_room = %self.lifecycle.settings().base_room)
    )]
    async fn run(mut self) {
        info!(
            target: "vc.actor.lifecycle",
            category = %self.lifecycle.settings().category,
            "LifecycleControllerActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "vc.actor.lifecycle",
                        "LifecycleControllerActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            // Queued messages plus the one in hand
                            self.mailbox.record_depth(self.receiver.len() + 1);
                            let message_type = message.message_type();
                            let started = Instant::now();
                            self.handle_message(message).await;
                            record_message_latency(message_type, started.elapsed());
                            self.mailbox.record_processed();
                            self.mailbox.record_depth(self.receiver.len());
                        }
                        None => {
                            info!(
                                target: "vc.actor.lifecycle",
                                "LifecycleControllerActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "vc.actor.lifecycle",
            sessions_remaining = self.lifecycle.store().len(),
            messages_processed = self.mailbox.messages_processed(),
            "LifecycleControllerActor stopped"
        );
    }

    async fn handle_message(&mut self, message: LifecycleMessage) {
        match message {
            LifecycleMessage::MemberEntered {
                room,
                member,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.on_member_enter(room, &member, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::MemberLeft {
                room,
                member,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.on_member_leave(room, &member, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::MemberMoved {
                from,
                to,
                member,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.on_member_move(from, to, &member, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::AssignTeam {
                room,
                member,
                label,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.assign_team(room, member, label, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::SplitTeams {
                room,
                requester,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.split_teams(room, requester, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::GatherTeams {
                room,
                requester,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.gather_teams(room, requester, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::PostTeamPanel {
                room,
                requester,
                at,
                respond_to,
            } => {
                let result = self.lifecycle.post_team_panel(room, requester, at).await;
                let _ = respond_to.send(result);
            }

            LifecycleMessage::RoomForPanel {
                message,
                respond_to,
            } => {
                let _ = respond_to.send(self.lifecycle.room_for_panel(message));
            }

            LifecycleMessage::ListSessions { at, respond_to } => {
                let _ = respond_to.send(self.lifecycle.list_sessions(at));
            }

            LifecycleMessage::GetSession {
                room,
                at,
                respond_to,
            } => {
                let _ = respond_to.send(self.lifecycle.session_snapshot(room, at));
            }

            LifecycleMessage::GetStatus { respond_to } => {
                let mut status = self.lifecycle.status().await;
                status.messages_processed = self.mailbox.messages_processed();
                status.mailbox_depth = self.mailbox.current_depth();
                status.mailbox_peak_depth = self.mailbox.peak_depth();
                let _ = respond_to.send(status);
            }
        }
    }
}
