//! Observability for the voice lifecycle service.
//!
//! All instrumentation uses `#[instrument(skip_all)]` with explicit fields.
//! Display names never appear in metric labels; ids appear only in logs.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `vc_sessions_active` | Gauge | none | Sessions currently tracked |
//! | `vc_sessions_started_total` | Counter | `origin` | Session starts |
//! | `vc_sessions_ended_total` | Counter | none | Session ends |
//! | `vc_session_duration_seconds` | Histogram | none | Session length |
//! | `vc_voice_events_total` | Counter | `transition` | Classified gateway events |
//! | `vc_deletions_scheduled_total` | Counter | none | Empty-room tasks started |
//! | `vc_deletion_outcomes_total` | Counter | `outcome` | How empty-room tasks ended |
//! | `vc_notices_sent_total` | Counter | `kind` | Notices posted |
//! | `vc_collaborator_failures_total` | Counter | `operation`, `kind` | Swallowed failures |
//! | `vc_mentions_forwarded_total` | Counter | `status` | Mention DMs sent or refused |
//! | `vc_team_operations_total` | Counter | `operation`, `status` | Team assign/split/gather |
//! | `vc_actor_mailbox_depth` | Gauge | `actor_type` | Backpressure indicator |
//! | `vc_message_latency_seconds` | Histogram | `message_type` | Actor message handling time |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
