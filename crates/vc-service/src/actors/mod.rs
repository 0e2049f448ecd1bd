//! Actor model for the lifecycle engine.
//!
//! ```text
//! LifecycleControllerActor (singleton)
//! └── owns RoomLifecycle
//!     └── owns SessionStore (sessions, team room index, panel index)
//! ```
//!
//! The scheduler and dispatcher run outside the actor and reach it only
//! through [`LifecycleControllerHandle`].
//!
//! # Modules
//!
//! - [`controller`] - handle and message loop
//! - [`lifecycle`] - the room lifecycle state machine
//! - [`messages`] - message and outcome types
//! - [`metrics`] - mailbox monitoring and actor counters

pub mod controller;
pub mod lifecycle;
pub mod messages;
pub mod metrics;

pub use controller::{LifecycleControllerActor, LifecycleControllerHandle};
pub use lifecycle::{LifecycleSettings, RoomLifecycle};
pub use messages::*;
pub use metrics::{ActorMetrics, MailboxMonitor};
