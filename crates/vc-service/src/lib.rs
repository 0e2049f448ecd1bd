//! Voice Lifecycle Service Library
//!
//! Runs the lifecycle of ad-hoc voice rooms on a chat platform:
//!
//! - Personal room provisioning when a member joins the base room
//! - Session tracking with per-member presence totals
//! - Delayed deletion of rooms left empty
//! - Team split/gather into temporary sub-rooms
//! - Mentions in room chats forwarded by direct message
//! - Session history in SQLite plus a read-only dashboard API
//!
//! # Architecture
//!
//! ```text
//! gateway events ──► EventDispatcher ──► LifecycleControllerActor (owns sessions)
//!                          │                     │
//!                          └──► DeletionScheduler └──► Collaborators
//!                                (one task per room)     (platform, history)
//! ```
//!
//! All session state lives inside the lifecycle actor, so presence events
//! are applied one at a time in arrival order. Platform access goes
//! through the traits in [`collaborators`], which keeps the engine testable
//! without a gateway connection.
//!
//! # Modules
//!
//! - [`actors`] - Lifecycle actor and state machine
//! - [`scheduler`] - Empty-room deletion timers
//! - [`dispatcher`] - Voice state classification and routing
//! - [`forward`] - Room chat mentions delivered as direct messages
//! - [`session`] - Session, presence and team model
//! - [`discord`] - serenity adapters
//! - [`history`] - SQLite session archive
//! - [`dashboard`] - Read-only HTTP API

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actors;
pub mod collaborators;
pub mod config;
pub mod dashboard;
pub mod discord;
pub mod dispatcher;
pub mod errors;
pub mod format;
pub mod forward;
pub mod history;
pub mod observability;
pub mod scheduler;
pub mod session;
