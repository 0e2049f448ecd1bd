//! Presence accumulation.
//!
//! A participant's connected time is `total_seconds` (closed intervals,
//! whole seconds) plus the open interval since `joined_at`, if any. Live
//! reads never fold the open interval in, so they can be repeated freely;
//! only [`ParticipantRecord::finalize`] moves time into the total.

use super::teams::TeamLabel;
use chrono::{DateTime, Utc};

/// Per-member presence within one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    /// Display name, refreshed on every join and leave.
    pub display_name: String,
    /// Seconds from intervals that have already closed. Never decreases.
    pub total_seconds: i64,
    /// Start of the open interval; `Some` exactly while the member occupies
    /// the anchor room or one of its team rooms.
    pub joined_at: Option<DateTime<Utc>>,
    /// Team assignment, if any.
    pub team: Option<TeamLabel>,
}

impl ParticipantRecord {
    /// A member that is connected as of `now`.
    #[must_use]
    pub fn connected(display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            display_name: display_name.into(),
            total_seconds: 0,
            joined_at: Some(now),
            team: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.joined_at.is_some()
    }

    /// Open an interval unless one is already open.
    ///
    /// Returns `true` if the member was not connected before.
    pub fn mark_joined(&mut self, now: DateTime<Utc>) -> bool {
        if self.joined_at.is_some() {
            return false;
        }
        self.joined_at = Some(now);
        true
    }

    /// Close the open interval, folding its whole seconds into the total.
    ///
    /// Returns the seconds added. Calling it on a disconnected record is a
    /// no-op returning 0.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> i64 {
        let Some(since) = self.joined_at.take() else {
            return 0;
        };
        let elapsed = elapsed_seconds(since, now);
        self.total_seconds = self.total_seconds.saturating_add(elapsed);
        elapsed
    }

    /// Total connected time as of `now`, without mutating the record.
    #[must_use]
    pub fn live_total(&self, now: DateTime<Utc>) -> i64 {
        let open = self
            .joined_at
            .map_or(0, |since| elapsed_seconds(since, now));
        self.total_seconds.saturating_add(open)
    }
}

/// Whole seconds between two instants, clamped at zero for clock skew.
#[must_use]
pub fn elapsed_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_seconds().max(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_live_total_is_idempotent() {
        let record = ParticipantRecord::connected("alice", at(10, 0, 0));

        assert_eq!(record.live_total(at(10, 1, 0)), 60);
        assert_eq!(record.live_total(at(10, 1, 0)), 60);
        assert_eq!(record.total_seconds, 0);
        assert!(record.is_connected());
    }

    #[test]
    fn test_finalize_accumulates_across_intervals() {
        let mut record = ParticipantRecord::connected("alice", at(10, 0, 0));

        assert_eq!(record.finalize(at(10, 5, 0)), 300);
        assert!(!record.is_connected());

        assert!(record.mark_joined(at(10, 6, 0)));
        assert_eq!(record.live_total(at(10, 6, 10)), 310);

        record.finalize(at(10, 6, 30));
        assert_eq!(record.total_seconds, 330);
    }

    #[test]
    fn test_finalize_without_open_interval_is_noop() {
        let mut record = ParticipantRecord::connected("alice", at(10, 0, 0));
        record.finalize(at(10, 0, 30));

        assert_eq!(record.finalize(at(11, 0, 0)), 0);
        assert_eq!(record.total_seconds, 30);
    }

    #[test]
    fn test_mark_joined_keeps_existing_interval() {
        let mut record = ParticipantRecord::connected("alice", at(10, 0, 0));

        assert!(!record.mark_joined(at(10, 2, 0)));
        assert_eq!(record.joined_at, Some(at(10, 0, 0)));
    }

    #[test]
    fn test_subsecond_remainders_are_truncated() {
        let start = at(10, 0, 0);
        let mut record = ParticipantRecord::connected("bob", start);

        record.finalize(start + Duration::milliseconds(1_999));
        assert_eq!(record.total_seconds, 1);
    }

    #[test]
    fn test_clock_going_backwards_never_reduces_total() {
        let mut record = ParticipantRecord::connected("bob", at(10, 0, 10));

        assert_eq!(record.live_total(at(10, 0, 0)), 0);
        record.finalize(at(10, 0, 0));
        assert_eq!(record.total_seconds, 0);
    }
}
