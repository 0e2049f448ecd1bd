//! Metrics definitions for the voice lifecycle service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `vc_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `transition`: 5 values (`VoiceTransition::as_str`)
//! - `outcome`: 5 values (`DeletionOutcome::as_str`)
//! - `operation`: bounded by call sites (~10 values)
//! - `kind`: bounded by `Notice::kind` / `CollaboratorError::kind`
//! - `message_type`: bounded by `LifecycleMessage` variants (~12 values)
//!
//! Room, member and guild ids are never used as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Session lengths: a minute to half a day
        .set_buckets_for_metric(
            Matcher::Full("vc_session_duration_seconds".to_string()),
            &[
                60.0, 300.0, 900.0, 1_800.0, 3_600.0, 7_200.0, 14_400.0, 28_800.0, 43_200.0,
            ],
        )
        .map_err(|e| format!("Failed to set session duration buckets: {e}"))?
        // Actor message handling includes platform REST calls
        .set_buckets_for_metric(
            Matcher::Prefix("vc_message".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set message latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Set the number of active sessions.
///
/// Metric: `vc_sessions_active`
pub fn set_sessions_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("vc_sessions_active").set(count as f64);
}

/// Record a session start.
///
/// Metric: `vc_sessions_started_total`
/// Labels: `origin` (fresh, adopted)
pub fn record_session_started(origin: &'static str) {
    counter!("vc_sessions_started_total", "origin" => origin).increment(1);
}

/// Record a session end and its length.
///
/// Metrics: `vc_sessions_ended_total`, `vc_session_duration_seconds`
pub fn record_session_ended(duration_seconds: i64) {
    counter!("vc_sessions_ended_total").increment(1);
    #[allow(clippy::cast_precision_loss)]
    histogram!("vc_session_duration_seconds").record(duration_seconds.max(0) as f64);
}

/// Record a team management operation.
///
/// Metric: `vc_team_operations_total`
/// Labels: `operation` (assign, split, gather, panel), `status` (success, error)
pub fn record_team_operation(operation: &'static str, status: &'static str) {
    counter!("vc_team_operations_total", "operation" => operation, "status" => status)
        .increment(1);
}

// ============================================================================
// Event Metrics
// ============================================================================

/// Record a classified voice state event.
///
/// Metric: `vc_voice_events_total`
/// Labels: `transition`
pub fn record_voice_event(transition: &'static str) {
    counter!("vc_voice_events_total", "transition" => transition).increment(1);
}

// ============================================================================
// Deletion Scheduler Metrics
// ============================================================================

/// Record a deletion task being started.
///
/// Metric: `vc_deletions_scheduled_total`
pub fn record_deletion_scheduled() {
    counter!("vc_deletions_scheduled_total").increment(1);
}

/// Record how a deletion task ended.
///
/// Metric: `vc_deletion_outcomes_total`
/// Labels: `outcome` (deleted, cancelled, reoccupied, room_gone, failed)
pub fn record_deletion_outcome(outcome: &'static str) {
    counter!("vc_deletion_outcomes_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// Collaborator Metrics
// ============================================================================

/// Record a notice posted.
///
/// Metric: `vc_notices_sent_total`
/// Labels: `kind`
pub fn record_notice_sent(kind: &'static str) {
    counter!("vc_notices_sent_total", "kind" => kind).increment(1);
}

/// Record a swallowed collaborator failure.
///
/// Metric: `vc_collaborator_failures_total`
/// Labels: `operation`, `kind` (not_found, rejected, unavailable)
pub fn record_collaborator_failure(operation: &'static str, kind: &'static str) {
    counter!("vc_collaborator_failures_total", "operation" => operation, "kind" => kind)
        .increment(1);
}

/// Record one mention forwarding attempt.
///
/// Metric: `vc_mentions_forwarded_total`
/// Labels: `status` (delivered, failed, everyone_blocked)
pub fn record_mention_forward(status: &'static str) {
    counter!("vc_mentions_forwarded_total", "status" => status).increment(1);
}

// ============================================================================
// Actor Metrics
// ============================================================================

/// Set the mailbox depth for an actor type.
///
/// Metric: `vc_actor_mailbox_depth`
/// Labels: `actor_type`
pub fn set_actor_mailbox_depth(actor_type: &'static str, depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("vc_actor_mailbox_depth", "actor_type" => actor_type).set(depth as f64);
}

/// Record how long the lifecycle actor spent on one message.
///
/// Metric: `vc_message_latency_seconds`
/// Labels: `message_type`
pub fn record_message_latency(message_type: &'static str, duration: Duration) {
    histogram!("vc_message_latency_seconds", "message_type" => message_type)
        .record(duration.as_secs_f64());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        set_sessions_active(3);
        record_session_started("fresh");
        record_session_ended(330);
        record_team_operation("split", "success");
        record_voice_event("moved");
        record_deletion_scheduled();
        record_deletion_outcome("deleted");
        record_notice_sent("join");
        record_collaborator_failure("delete_room", "not_found");
        record_mention_forward("delivered");
        set_actor_mailbox_depth("lifecycle", 0);
        record_message_latency("member_entered", Duration::from_millis(4));
    }

    #[test]
    fn test_metrics_are_captured_by_recorder() {
        use metrics_util::debugging::DebuggingRecorder;

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            set_sessions_active(2);
            record_session_started("adopted");
            record_session_ended(60);
            record_deletion_outcome("cancelled");
            record_collaborator_failure("send_notice", "unavailable");
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        for expected in [
            "vc_sessions_active",
            "vc_sessions_started_total",
            "vc_sessions_ended_total",
            "vc_session_duration_seconds",
            "vc_deletion_outcomes_total",
            "vc_collaborator_failures_total",
        ] {
            assert!(
                names.iter().any(|n| n == expected),
                "missing {expected} in {names:?}"
            );
        }
    }
}
