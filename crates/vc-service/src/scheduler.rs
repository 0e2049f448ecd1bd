//! Empty-room deletion scheduler.
//!
//! When a managed room empties, [`DeletionScheduler::schedule`] starts a
//! two-phase task: wait, warn in the room's chat, wait again, delete. A
//! member entering the room cancels the task through
//! [`DeletionScheduler::cancel`].
//!
//! At most one task exists per room. Each task carries a generation number
//! so a task that finishes after being cancelled and replaced never removes
//! its successor's entry.
//!
//! Cancellation is checked after every wait and immediately before the
//! warning and the delete, and the room is re-read from the membership view
//! each time. A room that was re-occupied or already deleted is left alone.
//!
//! # Graceful Shutdown
//!
//! Every task runs under a child of the scheduler's token. [`shutdown`]
//! cancels them all; no room is deleted after shutdown begins.
//!
//! [`shutdown`]: DeletionScheduler::shutdown

use crate::collaborators::{CollaboratorError, Collaborators, Notice, NoticeTarget};
use crate::observability::metrics::{
    record_collaborator_failure, record_deletion_outcome, record_deletion_scheduled,
    record_notice_sent,
};
use crate::session::ProvisionedRooms;
use common::types::RoomId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// The two waits of a deletion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionTimings {
    /// Empty time before the warning notice.
    pub first_empty_notice: Duration,
    /// Time between the warning and the delete.
    pub final_delete: Duration,
}

/// How a deletion task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    Cancelled,
    /// A real member was present at a re-check.
    Reoccupied,
    /// The room no longer existed.
    RoomGone,
    Failed,
}

impl DeletionOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeletionOutcome::Deleted => "deleted",
            DeletionOutcome::Cancelled => "cancelled",
            DeletionOutcome::Reoccupied => "reoccupied",
            DeletionOutcome::RoomGone => "room_gone",
            DeletionOutcome::Failed => "failed",
        }
    }
}

struct PendingDeletion {
    generation: u64,
    token: CancellationToken,
}

struct SchedulerInner {
    timings: DeletionTimings,
    base_room: RoomId,
    collaborators: Collaborators,
    provisioned: ProvisionedRooms,
    pending: Mutex<HashMap<RoomId, PendingDeletion>>,
    next_generation: AtomicU64,
    cancel_token: CancellationToken,
}

/// Schedules and cancels empty-room deletions. Cheap to clone.
#[derive(Clone)]
pub struct DeletionScheduler {
    inner: Arc<SchedulerInner>,
}

impl DeletionScheduler {
    #[must_use]
    pub fn new(
        timings: DeletionTimings,
        base_room: RoomId,
        collaborators: Collaborators,
        provisioned: ProvisionedRooms,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                timings,
                base_room,
                collaborators,
                provisioned,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                cancel_token,
            }),
        }
    }

    /// Start a deletion task for `room` unless one is already pending.
    ///
    /// Returns `true` if a new task was started. The base room is never
    /// scheduled.
    pub async fn schedule(&self, room: RoomId) -> bool {
        if room == self.inner.base_room || self.inner.cancel_token.is_cancelled() {
            return false;
        }

        let mut pending = self.inner.pending.lock().await;
        if pending.contains_key(&room) {
            debug!(
                target: "vc.scheduler",
                room = %room,
                "Deletion already pending"
            );
            return false;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = self.inner.cancel_token.child_token();
        pending.insert(
            room,
            PendingDeletion {
                generation,
                token: token.clone(),
            },
        );
        drop(pending);

        record_deletion_scheduled();
        debug!(
            target: "vc.scheduler",
            room = %room,
            generation,
            "Deletion scheduled"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(
            async move {
                let outcome = inner.run_deletion(room, &token).await;
                record_deletion_outcome(outcome.as_str());
                info!(
                    target: "vc.scheduler",
                    room = %room,
                    outcome = outcome.as_str(),
                    "Deletion task finished"
                );
                inner.finish(room, generation).await;
            }
            .instrument(info_span!("vc.scheduler.deletion", room = %room)),
        );

        true
    }

    /// Cancel the pending deletion for `room`. Returns `true` if one existed.
    pub async fn cancel(&self, room: RoomId) -> bool {
        let removed = self.inner.pending.lock().await.remove(&room);
        match removed {
            Some(entry) => {
                entry.token.cancel();
                debug!(
                    target: "vc.scheduler",
                    room = %room,
                    generation = entry.generation,
                    "Deletion cancelled"
                );
                true
            }
            None => false,
        }
    }

    pub async fn is_pending(&self, room: RoomId) -> bool {
        self.inner.pending.lock().await.contains_key(&room)
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Cancel every pending deletion and refuse new ones.
    pub async fn shutdown(&self) {
        self.inner.cancel_token.cancel();
        let drained = {
            let mut pending = self.inner.pending.lock().await;
            let count = pending.len();
            pending.clear();
            count
        };
        info!(
            target: "vc.scheduler",
            cancelled = drained,
            "Deletion scheduler shut down"
        );
    }
}

impl SchedulerInner {
    async fn run_deletion(&self, room: RoomId, token: &CancellationToken) -> DeletionOutcome {
        if !wait(self.timings.first_empty_notice, token).await {
            return DeletionOutcome::Cancelled;
        }
        if let Some(outcome) = self.blocker(room, token) {
            return outcome;
        }

        match self
            .collaborators
            .notifier
            .send_notice(NoticeTarget::Room(room), Notice::EmptyWarning)
            .await
        {
            Ok(_) => record_notice_sent("empty_warning"),
            Err(e) => log_failure("send_notice", &e),
        }

        if !wait(self.timings.final_delete, token).await {
            return DeletionOutcome::Cancelled;
        }
        if let Some(outcome) = self.blocker(room, token) {
            return outcome;
        }

        match self.collaborators.provisioning.delete_room(room).await {
            Ok(()) => {
                self.provisioned.remove(room).await;
                DeletionOutcome::Deleted
            }
            Err(e) if e.is_not_found() => {
                self.provisioned.remove(room).await;
                DeletionOutcome::RoomGone
            }
            Err(e) => {
                log_failure("delete_room", &e);
                DeletionOutcome::Failed
            }
        }
    }

    /// Reason not to proceed, re-read fresh from the membership view.
    fn blocker(&self, room: RoomId, token: &CancellationToken) -> Option<DeletionOutcome> {
        if token.is_cancelled() {
            return Some(DeletionOutcome::Cancelled);
        }
        let membership = &self.collaborators.membership;
        if membership.room(room).is_none() {
            return Some(DeletionOutcome::RoomGone);
        }
        if !membership.real_members(room).is_empty() {
            return Some(DeletionOutcome::Reoccupied);
        }
        None
    }

    async fn finish(&self, room: RoomId, generation: u64) {
        let mut pending = self.pending.lock().await;
        if pending
            .get(&room)
            .is_some_and(|entry| entry.generation == generation)
        {
            pending.remove(&room);
        }
    }
}

/// Sleep for `duration`; `false` if cancelled first.
async fn wait(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

fn log_failure(operation: &'static str, error: &CollaboratorError) {
    record_collaborator_failure(operation, error.kind());
    warn!(
        target: "vc.scheduler",
        operation,
        error = %error,
        "Deletion side effect failed"
    );
}
