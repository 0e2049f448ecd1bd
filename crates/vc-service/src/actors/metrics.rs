//! Actor metrics and mailbox monitoring.
//!
//! | Actor     | Normal | Warning | Critical |
//! |-----------|--------|---------|----------|
//! | Lifecycle | < 100  | 100-500 | > 500    |
//!
//! A deep lifecycle mailbox means platform REST calls are slow and voice
//! events are piling up behind them.

use crate::observability::metrics::set_actor_mailbox_depth;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Mailbox depth thresholds for the lifecycle actor.
pub const LIFECYCLE_MAILBOX_NORMAL: usize = 100;
pub const LIFECYCLE_MAILBOX_WARNING: usize = 500;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    /// Below normal threshold.
    Normal,
    /// Between normal and warning thresholds.
    Warning,
    /// Above warning threshold.
    Critical,
}

/// Mailbox monitor for tracking queue depth and emitting metrics.
///
/// The actor reports the real queue length (`Receiver::len`) around each
/// message, so depth reflects how many requests are waiting behind a slow
/// handler.
#[derive(Debug)]
pub struct MailboxMonitor {
    actor_type: &'static str,
    normal_threshold: usize,
    warning_threshold: usize,
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(
        actor_type: &'static str,
        normal_threshold: usize,
        warning_threshold: usize,
    ) -> Self {
        Self {
            actor_type,
            normal_threshold,
            warning_threshold,
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
        }
    }

    /// Monitor with the lifecycle actor thresholds.
    #[must_use]
    pub fn lifecycle() -> Self {
        Self::new(
            "lifecycle",
            LIFECYCLE_MAILBOX_NORMAL,
            LIFECYCLE_MAILBOX_WARNING,
        )
    }

    /// Record the number of messages queued (including the one in hand).
    pub fn record_depth(&self, depth: usize) {
        let previous = self.depth.swap(depth, Ordering::Relaxed);
        self.peak_depth.fetch_max(depth, Ordering::Relaxed);
        set_actor_mailbox_depth(self.actor_type, depth);

        let level = self.level_for_depth(depth);
        if level == self.level_for_depth(previous) {
            return;
        }
        match level {
            MailboxLevel::Critical => warn!(
                target: "vc.actor.mailbox",
                actor_type = self.actor_type,
                depth,
                threshold = self.warning_threshold,
                "Mailbox depth critical"
            ),
            MailboxLevel::Warning if previous < depth => debug!(
                target: "vc.actor.mailbox",
                actor_type = self.actor_type,
                depth,
                "Mailbox depth elevated"
            ),
            _ => {}
        }
    }

    /// Record a message as handled.
    pub fn record_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        self.level_for_depth(self.current_depth())
    }

    fn level_for_depth(&self, depth: usize) -> MailboxLevel {
        if depth > self.warning_threshold {
            MailboxLevel::Critical
        } else if depth > self.normal_threshold {
            MailboxLevel::Warning
        } else {
            MailboxLevel::Normal
        }
    }
}

/// Session counters kept by the lifecycle state machine and reported
/// through [`ControllerStatus`](super::ControllerStatus).
#[derive(Debug, Default)]
pub struct ActorMetrics {
    sessions_started: AtomicU64,
    sessions_ended: AtomicU64,
}

impl ActorMetrics {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_ended(&self) {
        self.sessions_ended.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sessions_ended(&self) -> u64 {
        self.sessions_ended.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_monitor_tracks_depth_and_peak() {
        let monitor = MailboxMonitor::lifecycle();

        monitor.record_depth(3);
        monitor.record_depth(1);
        assert_eq!(monitor.current_depth(), 1);
        assert_eq!(monitor.peak_depth(), 3);

        monitor.record_processed();
        monitor.record_processed();
        assert_eq!(monitor.messages_processed(), 2);
    }

    #[test]
    fn test_mailbox_monitor_levels() {
        let monitor = MailboxMonitor::new("test", 2, 4);
        assert_eq!(monitor.current_level(), MailboxLevel::Normal);

        monitor.record_depth(3);
        assert_eq!(monitor.current_level(), MailboxLevel::Warning);

        monitor.record_depth(5);
        assert_eq!(monitor.current_level(), MailboxLevel::Critical);

        monitor.record_depth(0);
        assert_eq!(monitor.current_level(), MailboxLevel::Normal);
        assert_eq!(monitor.peak_depth(), 5);
    }

    #[test]
    fn test_actor_metrics_session_counts() {
        let metrics = ActorMetrics::new();

        metrics.session_started();
        metrics.session_started();
        metrics.session_ended();

        assert_eq!(metrics.sessions_started(), 2);
        assert_eq!(metrics.sessions_ended(), 1);
    }
}
